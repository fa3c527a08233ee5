//! Integration tests for the Winix C545 bridge
//!
//! These tests drive the engine through its public surface with a mock
//! UART and verify:
//! - Sentence framing and classification
//! - The connection handshake and its timeouts
//! - AWS acknowledgements for every API code
//! - State synchronization in both directions
//! - Error handling for malformed traffic

use std::time::{Duration, Instant};
use winix_c545::{
    decode_states, encode_state_sentence, AqiIndicator, AttributeUpdate, ControlRequest,
    EntityRegistry, HandshakeState, MockTransport, RecordingSink, StateKey, StateMap,
    TestFixture, WinixConfig, WinixConfigBuilder, WinixEngine, WinixError, MAX_LINE_LENGTH,
    VERSION,
};

const ACKS: [&str; 2] = ["AWS_SEND:OK", "AWS_IND:SEND OK"];

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Fixture that has completed the MIB handshake
fn connected_fixture() -> TestFixture {
    let mut fx = TestFixture::new();
    let start = fx.start;
    fx.receive("AT*ICT*MIB=32", start);
    assert_eq!(fx.engine.handshake_state(), HandshakeState::Connected);
    fx.clear_sentences();
    fx
}

// ============================================================================
// Framing and Classification
// ============================================================================

#[test]
fn test_sentence_split_across_reads() {
    let mut fx = TestFixture::new();
    let now = fx.start;

    fx.engine.transport_mut().queue_incoming(b"AT*ICT*SET");
    fx.engine.tick(now);
    assert!(fx.sentences().is_empty());

    fx.engine.transport_mut().queue_incoming(b"MIB=18 C545\r\n");
    fx.engine.tick(now);
    assert_eq!(fx.sentences(), vec!["SETMIB:OK"]);
}

#[test]
fn test_bad_prefix_writes_nothing() {
    let mut fx = TestFixture::new();
    let now = fx.start;

    fx.receive("*ICT*MIB=32", now);
    fx.receive("MIB=32", now);
    fx.receive("", now);

    assert!(fx.engine.transport().written().is_empty());
    assert_eq!(fx.engine.stats().sentences_rejected, 3);
    assert_eq!(fx.engine.handshake_state(), HandshakeState::Reset);
}

#[test]
fn test_unsupported_sentence_writes_nothing() {
    let mut fx = TestFixture::new();
    fx.receive("AT*ICT*ASSOCIATED:0", fx.start);

    assert!(fx.sentences().is_empty());
    assert_eq!(fx.engine.stats().sentences_rejected, 1);
}

#[test]
fn test_oversized_sentence_keeps_leading_bytes() {
    let mut fx = TestFixture::new();
    let mut sentence = String::from("AT*ICT*SMODE=1");
    sentence.push_str(&"9".repeat(MAX_LINE_LENGTH * 2));

    fx.receive(&sentence, fx.start);
    assert_eq!(fx.sentences(), vec!["SMODE:OK"]);

    fx.receive("AT*ICT*SETMIB=18 C545", fx.start);
    assert_eq!(fx.sentences(), vec!["SMODE:OK", "SETMIB:OK"]);
}

#[test]
fn test_outgoing_frame_format() {
    let mut fx = TestFixture::new();
    fx.receive("AT*ICT*MCU_READY=1.2.0", fx.start);
    assert_eq!(fx.engine.transport().written(), b"*ICT*MCU_READY:OK\r\n");
}

// ============================================================================
// Handshake
// ============================================================================

#[test]
fn test_single_device_ready_after_timeout() {
    let mut fx = TestFixture::new();

    for s in 0..=10 {
        fx.engine.tick(fx.start + secs(s));
    }

    assert_eq!(fx.sentences(), vec!["DEVICEREADY"]);
    assert_eq!(fx.engine.handshake_state(), HandshakeState::DeviceReady);
}

#[test]
fn test_device_ready_repeats_while_mcu_silent() {
    let mut fx = TestFixture::new();

    fx.engine.tick(fx.start + secs(10));
    fx.engine.tick(fx.start + secs(15));
    fx.engine.tick(fx.start + secs(20));

    assert_eq!(fx.sentences(), vec!["DEVICEREADY", "DEVICEREADY"]);
}

#[test]
fn test_mcu_traffic_postpones_device_ready() {
    let mut fx = TestFixture::new();

    fx.receive("AT*ICT*SMODE=1", fx.start + secs(8));
    fx.engine.tick(fx.start + secs(12));
    assert_eq!(fx.sentences(), vec!["SMODE:OK"]);

    fx.engine.tick(fx.start + secs(18));
    assert_eq!(fx.sentences(), vec!["SMODE:OK", "DEVICEREADY"]);
}

#[test]
fn test_mib_query_connects() {
    let mut fx = TestFixture::new();

    fx.engine.tick(fx.start + secs(10));
    fx.receive("AT*ICT*MCU_READY=1.2.0", fx.start + secs(11));
    assert_eq!(fx.engine.handshake_state(), HandshakeState::DeviceReady);

    fx.receive("AT*ICT*MIB=32", fx.start + secs(12));
    fx.engine.tick(fx.start + secs(12));

    assert_eq!(
        fx.sentences(),
        vec![
            "DEVICEREADY",
            "MCU_READY:OK",
            "MIB:OK 7595",
            "AWS_IND:CONNECT OK"
        ]
    );
    assert_eq!(fx.engine.handshake_state(), HandshakeState::Connected);
}

#[test]
fn test_connected_is_quiet() {
    let mut fx = connected_fixture();

    fx.engine.tick(fx.start + secs(60));
    fx.engine.tick(fx.start + secs(600));
    assert!(fx.sentences().is_empty());
}

#[test]
fn test_custom_handshake_timeout() {
    let config = WinixConfigBuilder::new()
        .handshake_timeout(secs(2))
        .build();
    let start = Instant::now();
    let mut engine = WinixEngine::with_config(
        MockTransport::new(),
        EntityRegistry::new(),
        &config.protocol,
        start,
    );

    engine.tick(start + secs(1));
    assert!(engine.transport().sentences().is_empty());

    engine.tick(start + secs(2));
    assert_eq!(engine.transport().sentences(), vec!["DEVICEREADY"]);
}

// ============================================================================
// AWS Messages
// ============================================================================

#[test]
fn test_sensor_update_acks_and_notifies() {
    let mut fx = TestFixture::new();
    fx.receive(
        r#"AT*ICT*AWS_SEND=A220 {"S07":"01","S08":"116","S14":"34"}"#,
        fx.start,
    );

    assert_eq!(fx.sentences(), ACKS);
    assert_eq!(fx.engine.handshake_state(), HandshakeState::Connected);
    assert_eq!(
        fx.sink.updates(),
        vec![
            AttributeUpdate::AqiIndicator(AqiIndicator::Good),
            AttributeUpdate::Aqi(116),
            AttributeUpdate::Light(34),
        ]
    );
}

#[test]
fn test_repeated_state_is_not_renotified() {
    let mut fx = connected_fixture();
    let update = r#"AT*ICT*AWS_SEND=A210 {"A02":"1","A03":"2","A07":"1"}"#;

    fx.receive(update, fx.start);
    assert_eq!(fx.sink.updates().len(), 3);

    fx.sink.clear();
    fx.receive(update, fx.start);
    assert!(fx.sink.updates().is_empty());
    assert_eq!(fx.sentences(), vec![ACKS[0], ACKS[1], ACKS[0], ACKS[1]]);
}

#[test]
fn test_device_state_mapping() {
    let mut fx = connected_fixture();
    fx.receive(
        r#"AT*ICT*AWS_SEND=A210 {"A02":"0","A03":"1","A04":"3","A07":"0","A21":"1250"}"#,
        fx.start,
    );

    let attrs = fx.engine.attributes();
    assert_eq!(attrs.power, Some(false));
    assert_eq!(attrs.auto_mode, Some(true));
    assert_eq!(attrs.speed, Some(3));
    assert_eq!(attrs.sleep, Some(false));
    assert_eq!(attrs.plasmawave, Some(false));
    assert_eq!(attrs.filter_age, Some(1250));
}

#[test]
fn test_turbo_speed_from_wire() {
    let mut fx = connected_fixture();
    fx.receive(r#"AT*ICT*AWS_SEND=A210 {"A04":"5"}"#, fx.start);

    assert_eq!(fx.engine.attributes().speed, Some(4));
    assert!(fx.sink.updates().contains(&AttributeUpdate::Speed(4)));
}

#[test]
fn test_sleep_speed_keeps_numeric_speed() {
    let mut fx = connected_fixture();
    fx.receive(r#"AT*ICT*AWS_SEND=A210 {"A04":"2"}"#, fx.start);
    fx.receive(r#"AT*ICT*AWS_SEND=A210 {"A04":"6"}"#, fx.start);

    assert_eq!(
        fx.sink.updates(),
        vec![
            AttributeUpdate::Speed(2),
            AttributeUpdate::Sleep(false),
            AttributeUpdate::Sleep(true),
        ]
    );
    assert_eq!(fx.engine.attributes().speed, Some(2));
    assert_eq!(fx.engine.attributes().sleep, Some(true));
}

#[test]
fn test_disconnect_resets_handshake() {
    let mut fx = connected_fixture();
    fx.receive("AT*ICT*AWS_SEND=A102", fx.start + secs(1));

    assert_eq!(
        fx.sentences(),
        vec!["AWS_SEND:OK", "AWS_IND:SEND OK", "AWS_IND:DISCONNECTED"]
    );
    assert_eq!(fx.engine.handshake_state(), HandshakeState::Reset);

    fx.engine.tick(fx.start + secs(11));
    assert_eq!(fx.sentences().last().map(String::as_str), Some("DEVICEREADY"));
}

#[test]
fn test_error_and_version_info_are_acked() {
    let mut fx = connected_fixture();

    fx.receive("AT*ICT*AWS_SEND=A230 E12", fx.start);
    assert_eq!(fx.sentences(), ACKS);

    fx.clear_sentences();
    fx.receive("AT*ICT*AWS_SEND=A240 1.2.0", fx.start);
    assert_eq!(fx.sentences(), ACKS);
    assert!(fx.sink.updates().is_empty());
}

#[test]
fn test_unknown_api_code_writes_nothing() {
    let mut fx = connected_fixture();

    fx.receive("AT*ICT*AWS_SEND=A999 {}", fx.start);
    fx.receive("AT*ICT*AWS_SEND=A2", fx.start);
    fx.receive("AT*ICT*AWS_SEND=Axyz", fx.start);

    assert!(fx.sentences().is_empty());
    assert_eq!(fx.engine.stats().sentences_rejected, 3);
}

#[test]
fn test_malformed_token_writes_no_ack() {
    let mut fx = connected_fixture();

    fx.receive(r#"AT*ICT*AWS_SEND=A220 {"S07":"01",BADTOKEN}"#, fx.start);
    fx.receive(r#"AT*ICT*AWS_SEND=A220 {"S08":42}"#, fx.start);
    fx.receive(r#"AT*ICT*AWS_SEND=A220 {"S08":"42""#, fx.start);
    fx.receive(r#"AT*ICT*AWS_SEND=A220 {"S08":"-1"}"#, fx.start);

    assert!(fx.sentences().is_empty());
    assert!(fx.sink.updates().is_empty());
    assert!(fx.engine.pending_notifications().is_empty());
    assert_eq!(fx.engine.attributes().aqi_indicator, None);
    assert_eq!(fx.engine.attributes().aqi, None);
    assert_eq!(fx.engine.stats().state_updates, 0);
    assert_eq!(fx.engine.stats().sentences_rejected, 4);
}

// ============================================================================
// Control Requests
// ============================================================================

#[test]
fn test_turbo_request_encodes_wire_five() {
    let mut fx = connected_fixture();
    fx.engine
        .on_control_request(ControlRequest::fan(Some(true), Some(4)))
        .unwrap();

    assert_eq!(
        fx.sentences(),
        vec![r#"AWS_RECV:A211 12 {"A02":"1","A04":"5"}"#]
    );
}

#[test]
fn test_request_matching_device_state_writes_nothing() {
    let mut fx = connected_fixture();
    fx.receive(r#"AT*ICT*AWS_SEND=A210 {"A02":"1","A04":"2"}"#, fx.start);
    fx.clear_sentences();

    fx.engine
        .on_control_request(ControlRequest::fan(Some(true), Some(2)))
        .unwrap();
    assert!(fx.sentences().is_empty());

    fx.engine
        .on_control_request(ControlRequest::fan(Some(true), Some(3)))
        .unwrap();
    assert_eq!(fx.sentences(), vec![r#"AWS_RECV:A211 12 {"A04":"3"}"#]);
}

#[test]
fn test_sleep_requests() {
    let mut fx = connected_fixture();
    fx.receive(r#"AT*ICT*AWS_SEND=A210 {"A04":"3"}"#, fx.start);
    fx.clear_sentences();

    fx.engine
        .on_control_request(ControlRequest::default().with_sleep(true))
        .unwrap();
    fx.engine
        .on_control_request(ControlRequest::default().with_sleep(false))
        .unwrap();

    assert_eq!(
        fx.sentences(),
        vec![
            r#"AWS_RECV:A211 12 {"A04":"6"}"#,
            r#"AWS_RECV:A211 12 {"A04":"3"}"#,
        ]
    );
}

#[test]
fn test_switch_requests() {
    let mut fx = connected_fixture();
    fx.engine
        .on_control_request(
            ControlRequest::default()
                .with_plasmawave(false)
                .with_auto_mode(false),
        )
        .unwrap();

    assert_eq!(
        fx.sentences(),
        vec![r#"AWS_RECV:A211 12 {"A03":"2","A07":"0"}"#]
    );
}

#[test]
fn test_invalid_speed_rejected() {
    let mut fx = connected_fixture();
    let result = fx
        .engine
        .on_control_request(ControlRequest::fan(Some(true), Some(5)));

    assert!(matches!(result, Err(WinixError::InvalidControl(_))));
    assert!(fx.sentences().is_empty());
    assert_eq!(fx.engine.attributes().power, None);
}

#[test]
fn test_control_request_notifies_entities() {
    let mut fx = connected_fixture();
    fx.engine
        .on_control_request(ControlRequest::fan(Some(true), None))
        .unwrap();
    assert!(fx.sink.updates().is_empty());

    fx.engine.tick(fx.start);
    assert_eq!(fx.sink.updates(), vec![AttributeUpdate::Power(true)]);
}

// ============================================================================
// State Codec
// ============================================================================

#[test]
fn test_codec_examples() {
    let states = decode_states(r#"{"S07":"01","S08":"116","S14":"34"}"#).unwrap();
    assert_eq!(states.get("S07"), Some(1));
    assert_eq!(states.get("S08"), Some(116));
    assert_eq!(states.get("S14"), Some(34));

    let mut out = StateMap::new();
    out.insert(StateKey::new("A02").unwrap(), 1);
    assert_eq!(
        encode_state_sentence(&out).as_deref(),
        Some(r#"AWS_RECV:A211 12 {"A02":"1"}"#)
    );
    assert_eq!(encode_state_sentence(&StateMap::new()), None);
}

// ============================================================================
// Configuration and Wiring
// ============================================================================

#[test]
fn test_config_from_json_drives_engine() {
    let json = r#"{
        "serial": { "port": "/dev/ttyAMA0", "baud_rate": 115200 },
        "protocol": { "handshake_timeout": "3s", "max_line_length": 64 }
    }"#;
    let config: WinixConfig = serde_json::from_str(json).unwrap();
    config.validate().unwrap();

    let start = Instant::now();
    let mut engine = WinixEngine::with_config(
        MockTransport::new(),
        EntityRegistry::new(),
        &config.protocol,
        start,
    );
    engine.tick(start + secs(3));
    assert_eq!(engine.transport().sentences(), vec!["DEVICEREADY"]);
}

#[test]
fn test_unregistered_entities_are_skipped() {
    let start = Instant::now();
    let sink = RecordingSink::new();
    let mut entities = EntityRegistry::new();
    entities.set_aqi_sensor(sink.clone());

    let mut engine = WinixEngine::new(MockTransport::new(), entities, start);
    engine
        .transport_mut()
        .queue_incoming(b"AT*ICT*AWS_SEND=A220 {\"S08\":\"7\",\"S14\":\"9\"}\r\n");
    engine.tick(start);
    engine.tick(start);

    assert_eq!(sink.updates(), vec![AttributeUpdate::Aqi(7)]);
    assert_eq!(engine.stats().notifications, 1);
}

#[test]
fn test_version() {
    assert!(!VERSION.is_empty());
}
