// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The component sum type and behavior shared across roles.

use crate::client::Client;
use crate::event::ComponentSnapshot;
use crate::router::Router;
use crate::server::Server;
use crate::state::State;
use crate::target::{StartOrders, Target, TargetKind};
use serde::{Deserialize, Serialize};

/// Whether a component's lifecycle is driven by this tool or administered
/// elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Managed,
    External,
}

impl Mode {
    pub fn is_external(self) -> bool {
        matches!(self, Mode::External)
    }
}

/// Any component attached to a file system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "compname", rename_all = "lowercase")]
pub enum Component {
    Target(Target),
    Client(Client),
    Router(Router),
}

impl Component {
    /// Generic component kind used in events and remote selection.
    pub fn compname(&self) -> &'static str {
        match self {
            Component::Target(_) => "target",
            Component::Client(_) => "client",
            Component::Router(_) => "router",
        }
    }

    pub fn label(&self) -> String {
        match self {
            Component::Target(t) => t.label(),
            Component::Client(c) => c.label(),
            Component::Router(r) => r.label(),
        }
    }

    pub fn uniqueid(&self) -> String {
        match self {
            Component::Target(t) => t.uniqueid(),
            Component::Client(c) => c.uniqueid(),
            Component::Router(r) => r.uniqueid(),
        }
    }

    pub fn server(&self) -> &Server {
        match self {
            Component::Target(t) => &t.server,
            Component::Client(c) => &c.server,
            Component::Router(r) => &r.server,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Component::Target(t) => t.enabled,
            Component::Client(c) => c.enabled,
            Component::Router(r) => r.enabled,
        }
    }

    pub fn is_external(&self) -> bool {
        match self {
            Component::Target(t) => t.mode.is_external(),
            Component::Client(c) => c.mode.is_external(),
            Component::Router(r) => r.mode.is_external(),
        }
    }

    pub fn state(&self) -> Option<State> {
        match self {
            Component::Target(t) => t.state,
            Component::Client(c) => c.state,
            Component::Router(r) => r.state,
        }
    }

    pub fn set_state(&mut self, state: Option<State>) {
        match self {
            Component::Target(t) => t.state = state,
            Component::Client(c) => c.state = state,
            Component::Router(r) => r.state = state,
        }
    }

    pub fn status_info(&self) -> Option<&str> {
        match self {
            Component::Target(t) => t.status_info.as_deref(),
            Component::Client(c) => c.status_info.as_deref(),
            Component::Router(r) => r.status_info.as_deref(),
        }
    }

    pub fn set_status_info(&mut self, info: Option<String>) {
        match self {
            Component::Target(t) => t.status_info = info,
            Component::Client(c) => c.status_info = info,
            Component::Router(r) => r.status_info = info,
        }
    }

    /// Which operations this component takes part in.
    pub fn supports(&self, op: &str) -> bool {
        match self {
            Component::Target(_) => matches!(
                op,
                "format" | "tunefs" | "fsck" | "status" | "start" | "stop" | "execute"
            ),
            Component::Client(_) => matches!(op, "mount" | "umount" | "status" | "execute"),
            Component::Router(_) => matches!(op, "status" | "start" | "stop" | "execute"),
        }
    }

    /// Position of this component in the start sequence for a given
    /// per-invocation ordering.
    pub fn start_order(&self, orders: &StartOrders) -> u32 {
        match self {
            Component::Target(t) => orders.for_kind(t.kind),
            Component::Client(_) => orders.client,
            Component::Router(_) => orders.router,
        }
    }

    /// Tuning profile applied to the server hosting this component.
    pub fn tuning_profile(&self) -> &'static str {
        match self {
            Component::Target(t) => match t.kind {
                TargetKind::Mgt => "mgs",
                TargetKind::Mdt => "mds",
                TargetKind::Ost => "oss",
            },
            Component::Client(_) => "client",
            Component::Router(_) => "router",
        }
    }

    fn running_actions_mut(&mut self) -> &mut Vec<String> {
        match self {
            Component::Target(t) => &mut t.running_actions,
            Component::Client(c) => &mut c.running_actions,
            Component::Router(r) => &mut r.running_actions,
        }
    }

    pub fn running_actions(&self) -> &[String] {
        match self {
            Component::Target(t) => &t.running_actions,
            Component::Client(c) => &c.running_actions,
            Component::Router(r) => &r.running_actions,
        }
    }

    /// Register a running action by name.
    pub fn add_action(&mut self, name: &str) {
        self.running_actions_mut().push(name.to_string());
    }

    /// Remove a running action by name. Unknown names are ignored.
    pub fn del_action(&mut self, name: &str) {
        self.running_actions_mut().retain(|a| a != name);
    }

    pub fn snapshot(&self) -> ComponentSnapshot {
        match self {
            Component::Target(t) => t.snapshot(),
            Component::Client(c) => c.snapshot(),
            Component::Router(r) => r.snapshot(),
        }
    }

    /// Reconcile a distant report into this instance.
    pub fn update_from(&mut self, snap: &ComponentSnapshot) {
        match self {
            Component::Target(t) => t.update_from(snap),
            Component::Client(c) => c.update_from(snap),
            Component::Router(r) => r.update_from(snap),
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Component::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Component::Target(t) => Some(t),
            _ => None,
        }
    }
}
