// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cooperative run-loop.
//!
//! One `run_batch` call drives a whole [`ActionBatch`] to completion:
//! ready actions are launched, node events are drained serially from a
//! single channel, and worker completion cascades into dependent actions.
//! Every callback runs on this loop; there is no shared-memory concurrency.

use crate::action::{ActionBatch, ActionKind, Launched, WorkerHandler, WorkerReport};
use crate::fs::FileSystem;
use crate::FsError;
use shine_adapters::{RemoteShell, ShellOptions, WireEvent, WorkerId};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome of one run: orchestrator-level errors raised by handlers.
/// Component-level failures are reflected in component states instead.
#[derive(Default)]
pub struct RunResult {
    pub errors: Vec<FsError>,
}

struct LiveWorker {
    action: usize,
    awaiting: BTreeSet<String>,
    report: WorkerReport,
    handler: Box<dyn WorkerHandler>,
}

/// Run every action of a batch, honoring dependency edges. Returning is
/// the phase barrier: all workers have quiesced and all callbacks ran.
pub async fn run_batch<T: RemoteShell>(
    fs: &mut FileSystem,
    shell: &T,
    batch: ActionBatch,
) -> RunResult {
    fs.proxy_errors.clear();

    let mut result = RunResult::default();
    let total = batch.actions.len();
    if total == 0 {
        return result;
    }

    let mut pending: Vec<usize> = Vec::with_capacity(total);
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
    for (idx, action) in batch.actions.iter().enumerate() {
        pending.push(action.deps.len());
        for &dep in &action.deps {
            if dep < total {
                dependents[dep].push(idx);
            }
        }
    }

    let mut slots: Vec<Option<ActionKind>> = batch
        .actions
        .into_iter()
        .map(|action| Some(action.kind))
        .collect();

    let mut ready: VecDeque<usize> = (0..total).filter(|&i| pending[i] == 0).collect();
    let mut done = 0usize;
    let mut workers: HashMap<WorkerId, LiveWorker> = HashMap::new();
    let (tx, mut rx) = mpsc::channel::<(WorkerId, WireEvent)>(1024);

    loop {
        // Launch everything whose dependencies are satisfied.
        while let Some(idx) = ready.pop_front() {
            let Some(kind) = slots[idx].take() else {
                continue;
            };
            match kind {
                ActionKind::Local(mut action) => match action.launch(fs).await {
                    Launched::Done => {
                        complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                    }
                    Launched::Shell {
                        cmd,
                        nodes,
                        fanout,
                        mut handler,
                    } => {
                        if nodes.is_empty() {
                            if let Err(err) = handler.ev_close(fs, &WorkerReport::default()) {
                                result.errors.push(err);
                            }
                            complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                            continue;
                        }
                        let opts = shell_options(fs, fanout);
                        let awaiting: BTreeSet<String> =
                            nodes.iter().map(String::from).collect();
                        if let Err(err) = shell.spawn(idx, &cmd, &nodes, &opts, tx.clone()).await
                        {
                            tracing::warn!(error = %err, %cmd, "cannot launch local action");
                            complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                            continue;
                        }
                        workers.insert(
                            idx,
                            LiveWorker {
                                action: idx,
                                awaiting,
                                report: WorkerReport::default(),
                                handler,
                            },
                        );
                    }
                },
                ActionKind::Shell {
                    cmd,
                    nodes,
                    fanout,
                    mut handler,
                } => {
                    if nodes.is_empty() {
                        if let Err(err) = handler.ev_close(fs, &WorkerReport::default()) {
                            result.errors.push(err);
                        }
                        complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                        continue;
                    }
                    let opts = shell_options(fs, fanout);
                    let awaiting: BTreeSet<String> = nodes.iter().map(String::from).collect();
                    if let Err(err) = shell.spawn(idx, &cmd, &nodes, &opts, tx.clone()).await {
                        tracing::warn!(error = %err, %cmd, "cannot launch shell action");
                        complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                        continue;
                    }
                    workers.insert(
                        idx,
                        LiveWorker {
                            action: idx,
                            awaiting,
                            report: WorkerReport::default(),
                            handler,
                        },
                    );
                }
                ActionKind::Copy {
                    source,
                    dest,
                    nodes,
                    mut handler,
                } => {
                    if nodes.is_empty() {
                        if let Err(err) = handler.ev_close(fs, &WorkerReport::default()) {
                            result.errors.push(err);
                        }
                        complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                        continue;
                    }
                    let opts = shell_options(fs, None);
                    let awaiting: BTreeSet<String> = nodes.iter().map(String::from).collect();
                    if let Err(err) = shell
                        .copy(idx, &source, &dest, &nodes, &opts, tx.clone())
                        .await
                    {
                        tracing::warn!(error = %err, "cannot launch copy action");
                        complete(idx, &mut done, &dependents, &mut pending, &mut ready);
                        continue;
                    }
                    workers.insert(
                        idx,
                        LiveWorker {
                            action: idx,
                            awaiting,
                            report: WorkerReport::default(),
                            handler,
                        },
                    );
                }
            }
        }

        if done == total {
            break;
        }
        if workers.is_empty() {
            // Nothing outstanding and nothing ready: a dependency cycle or
            // an action lost to a launch failure. Do not hang.
            tracing::warn!(done, total, "run-loop drained with actions left over");
            break;
        }

        let Some((worker_id, event)) = rx.recv().await else {
            break;
        };
        let Some(worker) = workers.get_mut(&worker_id) else {
            continue;
        };

        match event {
            WireEvent::Read { node, line } => {
                worker.report.push_line(&node, &line);
                worker.handler.ev_read(fs, &node, &line);
            }
            WireEvent::Hup { node, rc } => {
                worker.awaiting.remove(&node);
                worker.report.set_rc(&node, rc);
                worker.handler.ev_hup(fs, &node, rc);
            }
            WireEvent::Timeout { node } => {
                worker.awaiting.remove(&node);
                worker.report.set_timeout(&node);
            }
        }

        if let Some(worker) = workers.get(&worker_id) {
            if worker.awaiting.is_empty() {
                // All worker state transitions happened; deliver the close
                // callback and cascade completion.
                let mut worker = match workers.remove(&worker_id) {
                    Some(w) => w,
                    None => continue,
                };
                if let Err(err) = worker.handler.ev_close(fs, &worker.report) {
                    result.errors.push(err);
                }
                complete(
                    worker.action,
                    &mut done,
                    &dependents,
                    &mut pending,
                    &mut ready,
                );
            }
        }
    }

    result
}

fn shell_options(fs: &FileSystem, fanout: Option<usize>) -> ShellOptions {
    ShellOptions {
        connect_timeout: Duration::from_secs(fs.settings.ssh_connect_timeout),
        run_timeout: match fs.settings.run_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
        fanout: fanout.unwrap_or(fs.settings.ssh_fanout),
    }
}

fn complete(
    idx: usize,
    done: &mut usize,
    dependents: &[Vec<usize>],
    pending: &mut [usize],
    ready: &mut VecDeque<usize>,
) {
    *done += 1;
    for &dep in &dependents[idx] {
        pending[dep] = pending[dep].saturating_sub(1);
        if pending[dep] == 0 {
            ready.push_back(dep);
        }
    }
}
