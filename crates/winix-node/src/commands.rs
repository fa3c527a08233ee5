//! Console commands for controlling the purifier
//!
//! One command per line:
//!
//! ```text
//! power on|off
//! speed 1-4
//! plasmawave on|off
//! auto on|off
//! sleep on|off
//! status
//! help
//! ```

use anyhow::{anyhow, bail, Result};
use winix_c545::ControlRequest;

/// Usage text printed by `help`
pub const USAGE: &str =
    "commands: power on|off, speed 1-4, plasmawave on|off, auto on|off, sleep on|off, status, help";

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward a control request to the engine
    Control(ControlRequest),
    /// Log the cached attributes and engine statistics
    Status,
    /// Log the usage text
    Help,
}

fn parse_switch(value: Option<&str>) -> Result<bool> {
    match value {
        Some("on") | Some("1") => Ok(true),
        Some("off") | Some("0") => Ok(false),
        Some(other) => bail!("expected on|off, got {:?}", other),
        None => bail!("expected on|off"),
    }
}

/// Parse one console line
pub fn parse_command(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        bail!("empty command");
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        bail!("unexpected argument {:?}", extra);
    }

    let request = ControlRequest::default();
    let command = match verb.to_ascii_lowercase().as_str() {
        "power" => Command::Control(request.with_power(parse_switch(arg)?)),
        "speed" => {
            let speed = arg
                .ok_or_else(|| anyhow!("expected a speed"))?
                .parse::<u8>()
                .map_err(|e| anyhow!("invalid speed: {}", e))?;
            Command::Control(request.with_speed(speed))
        }
        "plasmawave" => Command::Control(request.with_plasmawave(parse_switch(arg)?)),
        "auto" => Command::Control(request.with_auto_mode(parse_switch(arg)?)),
        "sleep" => Command::Control(request.with_sleep(parse_switch(arg)?)),
        "status" => Command::Status,
        "help" => Command::Help,
        other => bail!("unknown command {:?}", other),
    };

    Ok(command)
}
