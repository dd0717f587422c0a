// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events and the component snapshots they carry.

use crate::disk::Disk;
use crate::state::State;
use serde::{Deserialize, Serialize};

/// Outcome carrier attached to `failed` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i32>,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>, retcode: Option<i32>) -> Self {
        Self {
            message: Some(message.into()),
            retcode,
        }
    }
}

/// Serializable projection of a component, shipped inside framed events so a
/// distant invocation can reconcile its results into the caller's model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Generic component kind: `target`, `client`, `router` or `journal`.
    pub compname: String,
    /// Registry key of the component; for a journal, the key of the owning
    /// target.
    pub uniqueid: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<Disk>,
}

/// A lifecycle event: `<compname>.<action>` reached `<status>` on `<node>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsEvent {
    pub compname: String,
    pub action: String,
    pub status: String,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp: Option<ComponentSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ErrorResult>,
}

/// Callback interface fed by the file system's event funnel.
///
/// The command front-end installs one to print progress; remote mode installs
/// one that packs every event back on stdout.
pub trait EventHandler: Send {
    fn event_callback(&mut self, event: &FsEvent);
}
