// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a file system component.
///
/// Variants are declared in ascending severity so that `Ord` can be used to
/// merge incoherent reports: when several nodes disagree, the highest state
/// wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Service is started (target mounted, client mounted, router up).
    Mounted,
    /// Target is started and recovering its clients.
    Recovering,
    /// Component is administered outside of this tool.
    External,
    /// Service is cleanly stopped.
    Offline,
    /// A lifecycle action is underway. Transient: leaking this past a run
    /// is a bug and is coerced to `RuntimeError`.
    InProgress,
    /// A client-side operation failed.
    ClientError,
    /// A target-side check or operation failed.
    TargetError,
    /// The run itself misbehaved (no report, unparseable report, crash).
    RuntimeError,
}

impl State {
    /// Human text form, as shown by status displays.
    pub fn text(self) -> &'static str {
        match self {
            State::Mounted => "online",
            State::Recovering => "recovering",
            State::External => "external",
            State::Offline => "offline",
            State::InProgress => "in progress",
            State::ClientError | State::TargetError => "ERROR",
            State::RuntimeError => "CHECK FAILURE",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::State;

    #[test]
    fn severity_ordering() {
        assert!(State::Mounted < State::Recovering);
        assert!(State::Recovering < State::External);
        assert!(State::External < State::Offline);
        assert!(State::Offline < State::InProgress);
        assert!(State::InProgress < State::ClientError);
        assert!(State::ClientError < State::TargetError);
        assert!(State::TargetError < State::RuntimeError);
    }

    #[test]
    fn worst_state_wins() {
        let reports = [State::Mounted, State::TargetError, State::Offline];
        assert_eq!(reports.iter().max(), Some(&State::TargetError));
    }
}
