// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local actions for routers: the network stack is brought up and torn
//! down with the module tooling.

use crate::action::{Launched, LocalAction, WorkerHandler, WorkerReport};
use crate::fs::FileSystem;
use crate::FsError;
use shine_core::{NodeSet, Server, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouterOp {
    Start,
    Stop,
    Status,
}

impl RouterOp {
    pub(crate) fn parse(op: &str) -> Option<Self> {
        match op {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
        }
    }
}

pub(crate) struct RouterAction {
    id: String,
    op: RouterOp,
}

impl RouterAction {
    pub(crate) fn new(id: impl Into<String>, op: RouterOp) -> Self {
        Self { id: id.into(), op }
    }
}

#[async_trait::async_trait]
impl LocalAction for RouterAction {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched {
        let action = self.op.name();
        fs.comp_action_start(&self.id, action);
        fs.router_status_check(&self.id);

        let state = fs.components.get(&self.id).and_then(|c| c.state());
        match (self.op, state) {
            (RouterOp::Status, _) => {
                fs.comp_action_done(&self.id, action);
                Launched::Done
            }
            (RouterOp::Start, Some(State::Mounted)) | (RouterOp::Stop, Some(State::Offline)) => {
                fs.comp_action_done(&self.id, action);
                Launched::Done
            }
            (RouterOp::Start, _) => {
                fs.set_comp_state(&self.id, Some(State::InProgress));
                Launched::Shell {
                    cmd: "modprobe lnet && lctl net up".to_string(),
                    nodes: NodeSet::single(Server::hostname_short()),
                    fanout: None,
                    handler: Box::new(RouterToolHandler {
                        id: self.id.clone(),
                        action,
                        ok_state: State::Mounted,
                    }),
                }
            }
            (RouterOp::Stop, _) => {
                fs.set_comp_state(&self.id, Some(State::InProgress));
                Launched::Shell {
                    cmd: "lctl net down && lustre_rmmod".to_string(),
                    nodes: NodeSet::single(Server::hostname_short()),
                    fanout: None,
                    handler: Box::new(RouterToolHandler {
                        id: self.id.clone(),
                        action,
                        ok_state: State::Offline,
                    }),
                }
            }
        }
    }
}

struct RouterToolHandler {
    id: String,
    action: &'static str,
    ok_state: State,
}

impl WorkerHandler for RouterToolHandler {
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
            fs.set_comp_state(&self.id, Some(State::TargetError));
            fs.comp_action_failed(
                &self.id,
                self.action,
                Some(rc),
                format!("{} failed (rc={rc})", self.action),
            );
        }
        Ok(())
    }
}
