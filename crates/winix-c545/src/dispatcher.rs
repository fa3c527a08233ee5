//! Sentence classification
//!
//! Every sentence from the MCU starts with `AT*ICT*`. After the prefix the
//! leading token selects the handler, checked in a fixed order:
//!
//! | Token | Meaning | Reply |
//! |-------|---------|-------|
//! | `AWS_SEND` | AWS message, see [`crate::aws`] | per API code |
//! | `MCU_READY` | MCU finished booting | `MCU_READY:OK` |
//! | `MIB=32` | MCU queries module info | `MIB:OK 7595` |
//! | `SETMIB` | MCU sets module info | `SETMIB:OK` |
//! | `SMODE` | MCU sets module mode | `SMODE:OK` |
//!
//! Example traffic:
//!
//! ```text
//! AT*ICT*MCU_READY=1.2.0
//! AT*ICT*MIB=32
//! AT*ICT*SETMIB=18 C545
//! AT*ICT*AWS_SEND=A220 {"S07":"01","S08":"116","S14":"34"}
//! ```

use crate::aws::{AwsMessage, AWS_SEND};
use crate::config::RX_PREFIX;
use crate::error::{Result, WinixError};

/// Reply to `MCU_READY`
pub const MCU_READY_OK: &str = "MCU_READY:OK";
/// Reply to `MIB=32`, carrying the OEM module version
pub const MIB_OK: &str = "MIB:OK 7595";
/// Reply to `SETMIB`
pub const SETMIB_OK: &str = "SETMIB:OK";
/// Reply to `SMODE`
pub const SMODE_OK: &str = "SMODE:OK";

const MCU_READY: &str = "MCU_READY";
const MIB_QUERY: &str = "MIB=32";
const SETMIB: &str = "SETMIB";
const SMODE: &str = "SMODE";

/// A classified incoming sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Decoded AWS message
    Aws(AwsMessage),
    /// MCU boot announcement
    McuReady,
    /// Module info query
    Mib,
    /// Module info update
    SetMib,
    /// Module mode update
    SMode,
}

impl Inbound {
    /// Fixed reply for handshake sentences; AWS replies depend on the message
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Inbound::McuReady => Some(MCU_READY_OK),
            Inbound::Mib => Some(MIB_OK),
            Inbound::SetMib => Some(SETMIB_OK),
            Inbound::SMode => Some(SMODE_OK),
            Inbound::Aws(_) => None,
        }
    }
}

/// Strip the receive prefix and classify a framed sentence
pub fn parse_sentence(sentence: &str) -> Result<Inbound> {
    let body = sentence
        .strip_prefix(RX_PREFIX)
        .ok_or_else(|| WinixError::InvalidPrefix(sentence.to_string()))?;

    if body.starts_with(AWS_SEND) {
        AwsMessage::decode(body).map(Inbound::Aws)
    } else if body.starts_with(MCU_READY) {
        Ok(Inbound::McuReady)
    } else if body.starts_with(MIB_QUERY) {
        Ok(Inbound::Mib)
    } else if body.starts_with(SETMIB) {
        Ok(Inbound::SetMib)
    } else if body.starts_with(SMODE) {
        Ok(Inbound::SMode)
    } else {
        Err(WinixError::UnsupportedSentence(body.to_string()))
    }
}
