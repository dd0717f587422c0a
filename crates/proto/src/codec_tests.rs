// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use shine_core::{Server, State, Target, TargetKind};
use yare::parameterized;

fn sample_message() -> EventMessage {
    let mut target = Target::new(
        "lustre",
        TargetKind::Ost,
        1,
        "/dev/sdc",
        Server::with_default_nid("oss1"),
    );
    target.state = Some(State::Mounted);

    let mut msg = EventMessage::new("target", "start", "done");
    msg.node = Some("oss1".to_string());
    msg.comp = Some(target.snapshot());
    msg.extra
        .insert("info".to_string(), json!("lustre-OST0001 started"));
    msg
}

#[test]
fn round_trip() {
    let msg = sample_message();
    let line = pack(&msg).unwrap();
    assert!(line.starts_with("SHINE:3:"));
    let decoded = unpack(&line).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn round_trip_minimal() {
    let msg = EventMessage::new("client", "umount", "failed");
    let decoded = unpack(&pack(&msg).unwrap()).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn missing_prefix() {
    let err = unpack("mkfs: permission denied").unwrap_err();
    assert!(matches!(err, UnpackError::MissingPrefix));
}

#[test]
fn empty_line_is_missing_prefix() {
    assert!(matches!(unpack(""), Err(UnpackError::MissingPrefix)));
}

#[parameterized(
    no_separator = { "SHINE:3" },
    bad_version = { "SHINE:three:abcd" },
    empty_version = { "SHINE::abcd" },
)]
fn malformed_header(line: &str) {
    assert!(matches!(unpack(line), Err(UnpackError::Malformed(_))));
}

#[test]
fn version_mismatch() {
    let err = unpack("SHINE:99:aGVsbG8=").unwrap_err();
    assert!(matches!(err, UnpackError::VersionMismatch(99)));
}

#[test]
fn truncated_base64_payload() {
    let line = pack(&sample_message()).unwrap();
    let truncated = &line[..line.len() - 7];
    assert!(matches!(unpack(truncated), Err(UnpackError::Payload(_))));
}

#[test]
fn garbage_payload() {
    // Valid base64, not a mapping.
    let line = format!("SHINE:3:{}", BASE64.encode(b"not json"));
    assert!(matches!(unpack(&line), Err(UnpackError::Payload(_))));
}

#[test]
fn v2_failed_event_is_transcoded() {
    let body = json!({
        "node": "oss3",
        "rc": 28,
        "message": "No space left on device",
    });
    let line = format!(
        "SHINE:2:ev_starttarget_failed:{}",
        BASE64.encode(serde_json::to_vec(&body).unwrap())
    );

    let msg = unpack(&line).unwrap();
    assert_eq!(msg.action, "start");
    assert_eq!(msg.compname, "target");
    assert_eq!(msg.status, "failed");
    assert_eq!(msg.node.as_deref(), Some("oss3"));
    let result = msg.result.unwrap();
    assert_eq!(result.retcode, Some(28));
    assert_eq!(result.message.as_deref(), Some("No space left on device"));
}

#[test]
fn v2_done_event_has_no_result() {
    let body = json!({ "node": "login1" });
    let line = format!(
        "SHINE:2:ev_mountclient_done:{}",
        BASE64.encode(serde_json::to_vec(&body).unwrap())
    );
    let msg = unpack(&line).unwrap();
    assert_eq!(msg.action, "mount");
    assert_eq!(msg.compname, "client");
    assert_eq!(msg.status, "done");
    assert!(msg.result.is_none());
}

#[test]
fn v2_unknown_component_is_malformed() {
    let body = json!({});
    let line = format!(
        "SHINE:2:ev_startwidget_done:{}",
        BASE64.encode(serde_json::to_vec(&body).unwrap())
    );
    assert!(matches!(unpack(&line), Err(UnpackError::Malformed(_))));
}
