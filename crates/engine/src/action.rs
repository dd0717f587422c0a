// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions, dependency edges and per-worker reports.
//!
//! An [`ActionBatch`] is one phase of an operation. Actions start as soon
//! as their dependencies complete; a completed shell action hands its
//! [`WorkerReport`] to the handler that launched it. Groups are expressed
//! with plain dependency edges: a "group" is the list of its member ids,
//! and `depends_on` a group means depending on every member.

use crate::fs::FileSystem;
use shine_core::NodeSet;
use std::collections::BTreeMap;

pub use shine_adapters::WorkerId;

/// Index of an action within its batch.
pub type ActionId = usize;

/// What a local action decided to do once its dependencies completed.
pub enum Launched {
    /// The action finished synchronously (precondition failure, no-op,
    /// local probe).
    Done,
    /// The action needs a shell command; completion is reported to
    /// `handler`.
    Shell {
        cmd: String,
        nodes: NodeSet,
        /// Transport fanout override (the loopback workaround forces 1).
        fanout: Option<usize>,
        handler: Box<dyn WorkerHandler>,
    },
}

/// A unit of local work, launched by the run-loop once its dependencies
/// complete.
#[async_trait::async_trait]
pub trait LocalAction: Send {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched;
}

/// Callbacks of one shell worker. All methods run on the run-loop.
pub trait WorkerHandler: Send {
    fn ev_read(&mut self, _fs: &mut FileSystem, _node: &str, _line: &str) {}

    fn ev_hup(&mut self, _fs: &mut FileSystem, _node: &str, _rc: i32) {}

    /// Called once every node reported; `report` holds the per-node exit
    /// codes, timeouts and buffered output of this worker.
    fn ev_close(&mut self, fs: &mut FileSystem, report: &WorkerReport) -> Result<(), crate::FsError>;
}

/// One schedulable unit.
pub enum ActionKind {
    Local(Box<dyn LocalAction>),
    Shell {
        cmd: String,
        nodes: NodeSet,
        fanout: Option<usize>,
        handler: Box<dyn WorkerHandler>,
    },
    Copy {
        source: std::path::PathBuf,
        dest: std::path::PathBuf,
        nodes: NodeSet,
        handler: Box<dyn WorkerHandler>,
    },
}

pub(crate) struct ActionSpec {
    pub deps: Vec<ActionId>,
    pub kind: ActionKind,
}

/// The actions of one phase, with their dependency edges.
#[derive(Default)]
pub struct ActionBatch {
    pub(crate) actions: Vec<ActionSpec>,
}

impl ActionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action that starts once every action in `deps` completed.
    pub fn push(&mut self, deps: Vec<ActionId>, kind: ActionKind) -> ActionId {
        self.actions.push(ActionSpec { deps, kind });
        self.actions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Collected outcome of one shell worker across its node set.
#[derive(Debug, Default)]
pub struct WorkerReport {
    /// At least one node hit the run timeout.
    pub did_timeout: bool,
    retcodes: BTreeMap<String, i32>,
    timeouts: NodeSet,
    buffers: BTreeMap<String, Vec<String>>,
}

impl WorkerReport {
    pub(crate) fn push_line(&mut self, node: &str, line: &str) {
        self.buffers
            .entry(node.to_string())
            .or_default()
            .push(line.to_string());
    }

    pub(crate) fn set_rc(&mut self, node: &str, rc: i32) {
        self.retcodes.insert(node.to_string(), rc);
    }

    pub(crate) fn set_timeout(&mut self, node: &str) {
        self.did_timeout = true;
        self.timeouts.insert(node.to_string());
    }

    /// Exit codes grouped by value, ascending.
    pub fn iter_retcodes(&self) -> Vec<(i32, NodeSet)> {
        let mut by_rc: BTreeMap<i32, NodeSet> = BTreeMap::new();
        for (node, rc) in &self.retcodes {
            by_rc.entry(*rc).or_default().insert(node.clone());
        }
        by_rc.into_iter().collect()
    }

    pub fn iter_timeouts(&self) -> &NodeSet {
        &self.timeouts
    }

    /// Joined output of one node, if it produced any.
    pub fn node_buffer(&self, node: &str) -> Option<String> {
        self.buffers.get(node).map(|lines| lines.join("\n"))
    }

    pub fn max_retcode(&self) -> Option<i32> {
        self.retcodes.values().copied().max()
    }
}
