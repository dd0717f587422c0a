// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shine-core: component model for the shine cluster administration tool

pub mod client;
pub mod component;
pub mod disk;
pub mod event;
pub mod group;
pub mod nodeset;
pub mod probe;
pub mod router;
pub mod server;
pub mod settings;
pub mod state;
pub mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{Client, ClientError};
pub use component::{Component, Mode};
pub use disk::{Disk, DiskError};
pub use event::{ComponentSnapshot, ErrorResult, EventHandler, FsEvent};
pub use group::{ComponentGroup, GroupError};
pub use nodeset::NodeSet;
pub use probe::Procfs;
pub use router::Router;
pub use server::Server;
pub use settings::{Settings, SettingsError};
pub use state::State;
pub use target::{StartOrders, Target, TargetError, TargetKind};
