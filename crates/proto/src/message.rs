// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mapping carried by a framed message.

use serde::{Deserialize, Serialize};
use shine_core::{ComponentSnapshot, ErrorResult};

/// One event shipped between invocations.
///
/// `compname`/`action`/`status` are always present; the rest depends on the
/// event. Unknown keys are preserved in `extra` so that newer peers can add
/// fields without breaking older callers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventMessage {
    pub compname: String,
    pub action: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp: Option<ComponentSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ErrorResult>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventMessage {
    pub fn new(
        compname: impl Into<String>,
        action: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            compname: compname.into(),
            action: action.into(),
            status: status.into(),
            ..Self::default()
        }
    }
}
