// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the orchestrator

use shine_core::NodeSet;
use thiserror::Error;

/// Errors that abort an invocation, as opposed to per-component failures
/// which are folded into component states.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("syntax error: unrecognized target \"{0}\"")]
    BadTargetType(String),
    #[error("{0}")]
    Structure(String),
    #[error("{nodes}: {message} [rc={rc}]")]
    Remote {
        nodes: NodeSet,
        rc: i32,
        message: String,
    },
    #[error(transparent)]
    Group(#[from] shine_core::GroupError),
    #[error("cannot remove {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
