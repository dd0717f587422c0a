// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shine-adapters: process-level primitives behind the orchestrator.
//!
//! The only contract the engine relies on is [`RemoteShell`]: run one
//! command on a node set and deliver per-node output lines, exit codes and
//! timeouts through a channel. [`SshShell`] is the production
//! implementation; a scripted [`FakeShell`] is available behind the
//! `test-support` feature.

pub mod shell;
pub mod subprocess;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShell, ScriptedRun};

pub use shell::{RemoteShell, ShellError, ShellOptions, WireEvent, WorkerId};
pub use shell::SshShell;
