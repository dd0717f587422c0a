// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing and (de)serialization of event messages.

use crate::message::EventMessage;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use shine_core::{ComponentSnapshot, ErrorResult};
use thiserror::Error;

/// Fixed ASCII tag opening every framed message.
pub const MSG_MAGIC: &str = "SHINE:";

/// Current protocol version.
pub const MSG_VERSION: u32 = 3;

/// Why a line could not be decoded.
///
/// [`UnpackError::MissingPrefix`] means the line is not a framed message at
/// all (plain command output); the other variants are malformed or
/// unsupported messages and are reported per node.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("missing message prefix")]
    MissingPrefix,
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("message version mismatch: {0}")]
    VersionMismatch(u32),
    #[error("cannot decode message payload (check tool versions on both ends): {0}")]
    Payload(String),
}

/// Frame an event with the current protocol version.
pub fn pack(msg: &EventMessage) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(msg)?;
    Ok(format!("{MSG_MAGIC}{MSG_VERSION}:{}", BASE64.encode(payload)))
}

/// Parse a raw line from a distant invocation.
pub fn unpack(line: &str) -> Result<EventMessage, UnpackError> {
    let Some(rest) = line.strip_prefix(MSG_MAGIC) else {
        return Err(UnpackError::MissingPrefix);
    };

    let (version, data) = rest
        .split_once(':')
        .ok_or_else(|| UnpackError::Malformed("missing version separator".to_string()))?;
    let version: u32 = version
        .parse()
        .map_err(|err| UnpackError::Malformed(format!("bad version field: {err}")))?;

    match version {
        MSG_VERSION => {
            let raw = BASE64
                .decode(data.trim_end())
                .map_err(|err| UnpackError::Payload(err.to_string()))?;
            serde_json::from_slice(&raw).map_err(|err| UnpackError::Payload(err.to_string()))
        }
        2 => unpack_v2(data),
        other => Err(UnpackError::VersionMismatch(other)),
    }
}

/// Decode an old-style v2 message.
///
/// v2 messages carry the event name in the header and a bare mapping as
/// payload:
///
/// ```text
/// SHINE:2:ev_starttarget_done:<base64({node, comp, rc, message})>
/// ```
///
/// They are rewritten into the v3 shape: the event name is split into
/// action, component kind and status, and `failed` events get a synthesized
/// result carrier.
fn unpack_v2(data: &str) -> Result<EventMessage, UnpackError> {
    let (event, payload) = data
        .split_once(':')
        .ok_or_else(|| UnpackError::Malformed("missing v2 event separator".to_string()))?;

    let mut parts = event.splitn(3, '_');
    let (tag, actioncomp, status) = match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(actioncomp), Some(status)) => (tag, actioncomp, status),
        _ => {
            return Err(UnpackError::Malformed(format!(
                "unrecognized v2 event '{event}'"
            )))
        }
    };
    if tag != "ev" {
        return Err(UnpackError::Malformed(format!(
            "unrecognized v2 event '{event}'"
        )));
    }

    let (action, compname) = ["router", "client", "target", "journal"]
        .iter()
        .find_map(|name| {
            actioncomp
                .strip_suffix(name)
                .map(|action| (action.to_string(), name.to_string()))
        })
        .ok_or_else(|| {
            UnpackError::Malformed(format!("unknown v2 component in '{actioncomp}'"))
        })?;

    let raw = BASE64
        .decode(payload.trim_end())
        .map_err(|err| UnpackError::Payload(err.to_string()))?;
    let body: V2Body =
        serde_json::from_slice(&raw).map_err(|err| UnpackError::Payload(err.to_string()))?;

    let mut msg = EventMessage::new(compname, action, status);
    msg.node = body.node;
    msg.comp = body.comp;
    // v2 carries a result only on failure.
    if msg.status == "failed" {
        msg.result = Some(ErrorResult {
            message: body.message.clone(),
            retcode: body.rc,
        });
    }
    if let Some(rc) = body.rc {
        msg.extra.insert("rc".to_string(), Value::from(rc));
    }
    if let Some(message) = body.message {
        msg.extra.insert("message".to_string(), Value::from(message));
    }
    Ok(msg)
}

#[derive(Debug, serde::Deserialize)]
struct V2Body {
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    comp: Option<ComponentSnapshot>,
    #[serde(default)]
    rc: Option<i32>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
