// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote shell fan-out.
//!
//! One [`RemoteShell::spawn`] call runs a command on every node of a set
//! concurrently (bounded by the fanout) and streams per-node events into a
//! caller-owned channel. The caller decides when a worker is complete by
//! counting `Hup`/`Timeout` events against the node set it submitted.

use shine_core::{NodeSet, Server};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};

/// Identifies one `spawn` call among the workers of a run.
pub type WorkerId = usize;

/// Exit code reported when a child could not be spawned or its status is
/// unknown.
pub const RC_UNKNOWN: i32 = -1;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot spawn '{cmd}': {source}")]
    Spawn {
        cmd: String,
        source: std::io::Error,
    },
}

/// Per-node event delivered on the run channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// One line of stdout from a node.
    Read { node: String, line: String },
    /// The node's command finished with an exit code.
    Hup { node: String, rc: i32 },
    /// The node's command exceeded the run timeout and was killed.
    Timeout { node: String },
}

/// Tuning knobs applied to one `spawn` call.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Connect timeout handed to the remote shell client.
    pub connect_timeout: Duration,
    /// Whole-command timeout per node. `None` waits forever.
    pub run_timeout: Option<Duration>,
    /// Maximum concurrent node commands.
    pub fanout: usize,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            run_timeout: None,
            fanout: 64,
        }
    }
}

/// Run one shell command on a node set; deliver per-node stdout lines and
/// exit codes.
#[async_trait::async_trait]
pub trait RemoteShell: Clone + Send + Sync + 'static {
    /// Start `cmd` on every node. Returns as soon as the node tasks are
    /// scheduled; events flow through `tx` tagged with `worker`.
    async fn spawn(
        &self,
        worker: WorkerId,
        cmd: &str,
        nodes: &NodeSet,
        opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError>;

    /// Copy a local file onto every node, at the same path. Completion is
    /// reported like a command: one `Hup` per node.
    async fn copy(
        &self,
        worker: WorkerId,
        source: &Path,
        dest: &Path,
        nodes: &NodeSet,
        opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError>;
}

/// Production transport: `ssh` per distant node, plain `sh` on the local
/// node.
#[derive(Debug, Clone, Default)]
pub struct SshShell;

impl SshShell {
    fn node_command(node: &str, cmd: &str, opts: &ShellOptions) -> Command {
        if node == Server::hostname_short() {
            let mut command = Command::new("sh");
            command.arg("-c").arg(cmd);
            command
        } else {
            let mut command = Command::new("ssh");
            command
                .arg("-oBatchMode=yes")
                .arg(format!(
                    "-oConnectTimeout={}",
                    opts.connect_timeout.as_secs()
                ))
                .arg(node)
                .arg(cmd);
            command
        }
    }

    fn copy_command(node: &str, source: &Path, dest: &Path, opts: &ShellOptions) -> Command {
        if node == Server::hostname_short() {
            let mut command = Command::new("cp");
            command.arg(source).arg(dest);
            command
        } else {
            let mut command = Command::new("scp");
            command
                .arg("-B")
                .arg(format!(
                    "-oConnectTimeout={}",
                    opts.connect_timeout.as_secs()
                ))
                .arg(source)
                .arg(format!("{}:{}", node, dest.display()));
            command
        }
    }

    async fn run_nodes<F>(
        worker: WorkerId,
        nodes: &NodeSet,
        opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
        build: F,
    ) where
        F: Fn(&str) -> Command,
    {
        let fanout = Arc::new(Semaphore::new(opts.fanout.max(1)));
        for node in nodes.iter() {
            let node = node.to_string();
            let mut command = build(&node);
            let tx = tx.clone();
            let fanout = Arc::clone(&fanout);
            let run_timeout = opts.run_timeout;
            tokio::spawn(async move {
                // Semaphore errors only on close; treat as no limit.
                let _slot = fanout.acquire_owned().await.ok();
                let event = match run_timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, stream_node(&node, &mut command, &tx, worker))
                            .await
                        {
                            Ok(rc) => WireEvent::Hup {
                                node: node.clone(),
                                rc,
                            },
                            Err(_elapsed) => WireEvent::Timeout { node: node.clone() },
                        }
                    }
                    None => {
                        let rc = stream_node(&node, &mut command, &tx, worker).await;
                        WireEvent::Hup {
                            node: node.clone(),
                            rc,
                        }
                    }
                };
                let _ = tx.send((worker, event)).await;
            });
        }
    }
}

/// Run one node command, streaming stdout lines. Returns the exit code.
async fn stream_node(
    node: &str,
    command: &mut Command,
    tx: &mpsc::Sender<(WorkerId, WireEvent)>,
    worker: WorkerId,
) -> i32 {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(node, error = %err, "cannot spawn remote shell");
            return RC_UNKNOWN;
        }
    };

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let event = WireEvent::Read {
                node: node.to_string(),
                line,
            };
            if tx.send((worker, event)).await.is_err() {
                break;
            }
        }
    }

    match child.wait().await {
        Ok(status) => status.code().unwrap_or(RC_UNKNOWN),
        Err(err) => {
            tracing::warn!(node, error = %err, "cannot reap remote shell");
            RC_UNKNOWN
        }
    }
}

#[async_trait::async_trait]
impl RemoteShell for SshShell {
    async fn spawn(
        &self,
        worker: WorkerId,
        cmd: &str,
        nodes: &NodeSet,
        opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError> {
        tracing::debug!(worker, %nodes, cmd, "spawning remote shell");
        let cmd = cmd.to_string();
        Self::run_nodes(worker, nodes, opts, tx, |node| {
            Self::node_command(node, &cmd, opts)
        })
        .await;
        Ok(())
    }

    async fn copy(
        &self,
        worker: WorkerId,
        source: &Path,
        dest: &Path,
        nodes: &NodeSet,
        opts: &ShellOptions,
        tx: mpsc::Sender<(WorkerId, WireEvent)>,
    ) -> Result<(), ShellError> {
        tracing::debug!(worker, %nodes, source = %source.display(), "copying file to nodes");
        let source: PathBuf = source.to_path_buf();
        let dest: PathBuf = dest.to_path_buf();
        Self::run_nodes(worker, nodes, opts, tx, |node| {
            Self::copy_command(node, &source, &dest, opts)
        })
        .await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
