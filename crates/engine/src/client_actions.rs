// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local mount/umount/status actions for clients on this server.

use crate::action::{Launched, LocalAction, WorkerHandler, WorkerReport};
use crate::fs::{FileSystem, OpOptions};
use crate::FsError;
use shine_core::{Component, NodeSet, Server, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientOp {
    Mount,
    Umount,
    Status,
}

impl ClientOp {
    pub(crate) fn parse(op: &str) -> Option<Self> {
        match op {
            "mount" => Some(Self::Mount),
            "umount" => Some(Self::Umount),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Umount => "umount",
            Self::Status => "status",
        }
    }
}

pub(crate) struct ClientAction {
    id: String,
    op: ClientOp,
    opts: OpOptions,
}

impl ClientAction {
    pub(crate) fn new(id: impl Into<String>, op: ClientOp, opts: OpOptions) -> Self {
        Self {
            id: id.into(),
            op,
            opts,
        }
    }
}

#[async_trait::async_trait]
impl LocalAction for ClientAction {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched {
        let action = self.op.name();

        if self.op != ClientOp::Status {
            fs.set_comp_state(&self.id, Some(State::InProgress));
        }
        fs.comp_action_start(&self.id, action);

        if let Err(err) = fs.client_mount_check(&self.id) {
            fs.set_comp_state(&self.id, Some(State::ClientError));
            fs.comp_action_failed(&self.id, action, None, err.to_string());
            return Launched::Done;
        }
        if self.op == ClientOp::Status {
            fs.comp_action_done(&self.id, action);
            return Launched::Done;
        }

        let (state, label, cmd) = {
            let Some(Component::Client(client)) = fs.components.get(&self.id) else {
                return Launched::Done;
            };
            let cmd = match self.op {
                ClientOp::Mount => mount_command(fs, client, &self.opts),
                ClientOp::Umount => format!("umount {}", client.mount_path.display()),
                ClientOp::Status => String::new(),
            };
            (client.state, client.label(), cmd)
        };

        match (self.op, state) {
            (ClientOp::Mount, Some(State::Mounted)) => {
                fs.set_comp_status_info(&self.id, Some(format!("{label} is already mounted")));
                fs.comp_action_done(&self.id, action);
                Launched::Done
            }
            (ClientOp::Umount, Some(State::Offline)) => {
                fs.set_comp_status_info(&self.id, Some(format!("{label} is already unmounted")));
                fs.comp_action_done(&self.id, action);
                Launched::Done
            }
            _ => {
                fs.set_comp_state(&self.id, Some(State::InProgress));
                let ok_state = match self.op {
                    ClientOp::Mount => State::Mounted,
                    _ => State::Offline,
                };
                Launched::Shell {
                    cmd,
                    nodes: NodeSet::single(Server::hostname_short()),
                    fanout: None,
                    handler: Box::new(ClientToolHandler {
                        id: self.id.clone(),
                        action,
                        ok_state,
                    }),
                }
            }
        }
    }
}

fn mount_command(fs: &FileSystem, client: &shine_core::Client, opts: &OpOptions) -> String {
    let mgs = fs.mgs_nids().join(":");
    let mut cmd = format!(
        "mkdir -p {} && mount -t lustre",
        client.mount_path.display()
    );
    let options: Vec<&str> = client
        .mount_options
        .as_deref()
        .into_iter()
        .chain(opts.addopts.as_deref())
        .collect();
    if !options.is_empty() {
        cmd.push_str(&format!(" -o {}", options.join(",")));
    }
    cmd.push_str(&format!(
        " {}:/{} {}",
        mgs,
        client.fs_name,
        client.mount_path.display()
    ));
    cmd
}

struct ClientToolHandler {
    id: String,
    action: &'static str,
    ok_state: State,
}

impl WorkerHandler for ClientToolHandler {
    fn ev_close(&mut self, fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        if report.did_timeout {
            fs.set_comp_state(&self.id, Some(State::RuntimeError));
            fs.comp_action_timeout(&self.id, self.action);
            return Ok(());
        }

        let rc = report.max_retcode().unwrap_or(-1);
        if rc == 0 {
            fs.set_comp_state(&self.id, Some(self.ok_state));
            fs.comp_action_done(&self.id, self.action);
        } else {
            let node = Server::hostname_short();
            let detail = report.node_buffer(&node).unwrap_or_default();
            let msg = if detail.is_empty() {
                format!("{} failed (rc={rc})", self.action)
            } else {
                format!("{} failed (rc={rc}): {detail}", self.action)
            };
            fs.set_comp_state(&self.id, Some(State::ClientError));
            fs.comp_action_failed(&self.id, self.action, Some(rc), msg);
        }
        Ok(())
    }
}
