// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routers: hosts forwarding network traffic for the file system.

use crate::component::Mode;
use crate::event::ComponentSnapshot;
use crate::probe::Procfs;
use crate::server::Server;
use crate::state::State;
use serde::{Deserialize, Serialize};

/// A host routing file system traffic between networks. Up when the network
/// stack modules are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Router {
    pub fs_name: String,
    pub server: Server,
    pub enabled: bool,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_info: Option<String>,
    #[serde(default)]
    pub running_actions: Vec<String>,
}

impl Router {
    pub fn new(fs_name: impl Into<String>, server: Server) -> Self {
        Self {
            fs_name: fs_name.into(),
            server,
            enabled: true,
            mode: Mode::Managed,
            state: None,
            status_info: None,
            running_actions: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}-router", self.fs_name)
    }

    pub fn uniqueid(&self) -> String {
        format!("{}@{}", self.label(), self.server.hostname)
    }

    /// A router is up when the network stack directory is exported by the
    /// kernel.
    pub fn status_check(&mut self, procfs: &Procfs) {
        self.state = if procfs.lnet.is_dir() {
            Some(State::Mounted)
        } else {
            Some(State::Offline)
        };
    }

    pub fn snapshot(&self) -> ComponentSnapshot {
        ComponentSnapshot {
            compname: "router".to_string(),
            uniqueid: self.uniqueid(),
            label: self.label(),
            state: self.state,
            status_info: self.status_info.clone(),
            index: None,
            disk: None,
        }
    }

    pub fn update_from(&mut self, snap: &ComponentSnapshot) {
        self.state = snap.state;
        self.status_info.clone_from(&snap.status_info);
    }
}
