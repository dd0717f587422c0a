// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for tests.
//!
//! Rules are matched against the submitted command line; the first rule
//! whose pattern is a substring of the command wins. Unmatched commands
//! succeed silently on every node (rc 0, no output).

use crate::shell::{RemoteShell, ShellError, ShellOptions, WireEvent, WorkerId};
use parking_lot::Mutex;
use shine_core::NodeSet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Scripted behavior of one node for one matched command.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    pub lines: Vec<String>,
    pub rc: i32,
    pub timeout: bool,
}

impl ScriptedRun {
    pub fn ok(lines: Vec<String>) -> Self {
        Self {
            lines,
            rc: 0,
            timeout: false,
        }
    }

    pub fn failed(rc: i32, lines: Vec<String>) -> Self {
        Self {
            lines,
            rc,
            timeout: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            lines: Vec::new(),
            rc: 0,
            timeout: true,
        }
    }
}

#[derive(Debug, Default)]
struct Rule {
    pattern: String,
    nodes: HashMap<String, ScriptedRun>,
}

#[derive(Debug, Default)]
struct Inner {
    rules: Vec<Rule>,
    calls: Vec<(String, NodeSet)>,
    copies: Vec<(String, NodeSet)>,
}

/// In-memory [`RemoteShell`] with scripted per-node outputs and a call log.
#[derive(Debug, Clone, Default)]
pub struct FakeShell {
    inner: Arc<Mutex<Inner>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior of `node` for commands containing `pattern`.
    pub fn on_command(&self, pattern: &str, node: &str, run: ScriptedRun) {
        let mut inner = self.inner.lock();
        if let Some(rule) = inner.rules.iter_mut().find(|r| r.pattern == pattern) {
            rule.nodes.insert(node.to_string(), run);
            return;
        }
        let mut nodes = HashMap::new();
        nodes.insert(node.to_string(), run);
        inner.rules.push(Rule {
            pattern: pattern.to_string(),
            nodes,
        });
    }

    /// Commands submitted so far, in submission order.
    pub fn calls(&self) -> Vec<(String, NodeSet)> {
        self.inner.lock().calls.clone()
    }

    /// Copy destinations submitted so far.
    pub fn copies(&self) -> Vec<(String, NodeSet)> {
        self.inner.lock().copies.clone()
    }

    fn run_for(&self, cmd: &str, node: &str) -> ScriptedRun {
        let inner = self.inner.lock();
        for rule in &inner.rules {
            if cmd.contains(&rule.pattern) {
                return rule.nodes.get(node).cloned().unwrap_or_default();
            }
        }
        ScriptedRun::default()
    }
}

#[async_trait::async_trait]
impl RemoteShell for FakeShell {
    async fn spawn(
        &self,
        worker: WorkerId,
        cmd: &str,
        nodes: &NodeSet,
        _opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError> {
        self.inner
            .lock()
            .calls
            .push((cmd.to_string(), nodes.clone()));

        for node in nodes.iter() {
            let run = self.run_for(cmd, node);
            for line in run.lines {
                let _ = tx
                    .send((
                        worker,
                        WireEvent::Read {
                            node: node.to_string(),
                            line,
                        },
                    ))
                    .await;
            }
            let last = if run.timeout {
                WireEvent::Timeout {
                    node: node.to_string(),
                }
            } else {
                WireEvent::Hup {
                    node: node.to_string(),
                    rc: run.rc,
                }
            };
            let _ = tx.send((worker, last)).await;
        }
        Ok(())
    }

    async fn copy(
        &self,
        worker: WorkerId,
        _source: &Path,
        dest: &Path,
        nodes: &NodeSet,
        _opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError> {
        self.inner
            .lock()
            .copies
            .push((dest.display().to_string(), nodes.clone()));

        let pattern = format!("copy:{}", dest.display());
        for node in nodes.iter() {
            let run = self.run_for(&pattern, node);
            let last = if run.timeout {
                WireEvent::Timeout {
                    node: node.to_string(),
                }
            } else {
                WireEvent::Hup {
                    node: node.to_string(),
                    rc: run.rc,
                }
            };
            let _ = tx.send((worker, last)).await;
        }
        Ok(())
    }
}
