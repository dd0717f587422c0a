// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local lifecycle actions on targets hosted by this server.
//!
//! Every action follows the same shape: set the transient state, raise the
//! `start` event, verify the precondition against the probed state, then
//! either finish synchronously (no-op or refusal) or launch the external
//! tool and let the completion handler settle the final state.

use crate::action::{Launched, LocalAction, WorkerHandler, WorkerReport};
use crate::fs::{FileSystem, MountdataPolicy, OpOptions};
use crate::FsError;
use shine_core::{Component, NodeSet, Server, State, Target, TargetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetOp {
    Format,
    Tunefs,
    Fsck,
    Status,
    Start,
    Stop,
}

impl TargetOp {
    pub(crate) fn parse(op: &str) -> Option<Self> {
        match op {
            "format" => Some(Self::Format),
            "tunefs" => Some(Self::Tunefs),
            "fsck" => Some(Self::Fsck),
            "status" => Some(Self::Status),
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Tunefs => "tunefs",
            Self::Fsck => "fsck",
            Self::Status => "status",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

pub(crate) struct TargetAction {
    id: String,
    op: TargetOp,
    opts: OpOptions,
}

impl TargetAction {
    pub(crate) fn new(id: impl Into<String>, op: TargetOp, opts: OpOptions) -> Self {
        Self {
            id: id.into(),
            op,
            opts,
        }
    }

    fn with_mountdata(&self) -> bool {
        !matches!(self.opts.mountdata, MountdataPolicy::Never)
    }
}

/// What to do after the precondition check, computed under a shared borrow
/// of the target.
enum Decision {
    Launch { cmd: String, fanout: Option<usize> },
    Succeed(Option<String>),
    Refuse(String),
}

#[async_trait::async_trait]
impl LocalAction for TargetAction {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched {
        let action = self.op.name();

        if self.op != TargetOp::Status {
            fs.set_comp_state(&self.id, Some(State::InProgress));
        }
        fs.comp_action_start(&self.id, action);

        // format/tunefs/fsck work on stopped targets whose record may not
        // parse yet; they skip the on-disk record check.
        let mountdata = match self.op {
            TargetOp::Format | TargetOp::Tunefs | TargetOp::Fsck => false,
            _ => self.with_mountdata(),
        };
        if let Err(err) = fs.target_check_status(&self.id, mountdata).await {
            let rc = matches!(self.op, TargetOp::Format | TargetOp::Fsck).then_some(-1);
            fs.comp_action_failed(&self.id, action, rc, err.to_string());
            return Launched::Done;
        }
        if self.op == TargetOp::Status {
            fs.comp_action_done(&self.id, action);
            return Launched::Done;
        }

        let decision = {
            let Some(target) = fs.components.get(&self.id).and_then(Component::as_target) else {
                return Launched::Done;
            };
            decide(self.op, target, fs, &self.opts)
        };

        match decision {
            Decision::Launch { cmd, fanout } => {
                fs.set_comp_state(&self.id, Some(State::InProgress));
                Launched::Shell {
                    cmd,
                    nodes: NodeSet::single(Server::hostname_short()),
                    fanout,
                    handler: Box::new(ToolHandler {
                        id: self.id.clone(),
                        action,
                        success: success_state(self.op),
                    }),
                }
            }
            Decision::Succeed(info) => {
                if let Some(info) = info {
                    fs.set_comp_status_info(&self.id, Some(info));
                }
                fs.comp_action_done(&self.id, action);
                Launched::Done
            }
            Decision::Refuse(reason) => {
                fs.set_comp_state(&self.id, Some(State::TargetError));
                let rc = matches!(self.op, TargetOp::Format | TargetOp::Fsck).then_some(-1);
                fs.comp_action_failed(&self.id, action, rc, reason);
                Launched::Done
            }
        }
    }
}

fn decide(op: TargetOp, target: &Target, fs: &FileSystem, opts: &OpOptions) -> Decision {
    // Workaround: the format-style tools misbehave when run concurrently
    // against loopback files, so non-block backends run with fanout 1.
    let fanout = (!target.disk.is_block).then_some(1);

    match op {
        TargetOp::Format => match target.state {
            Some(State::Offline) => Decision::Launch {
                cmd: format_command(fs, target, opts),
                fanout,
            },
            Some(State::Mounted | State::Recovering) => Decision::Refuse(format!(
                "Cannot format: target {} is started",
                target.longtext()
            )),
            _ => Decision::Refuse(format!("Cannot format: target {} is busy", target.longtext())),
        },
        TargetOp::Tunefs => match target.state {
            Some(State::Offline) => Decision::Launch {
                cmd: tunefs_command(target, opts),
                fanout,
            },
            Some(State::Mounted | State::Recovering) => Decision::Refuse(format!(
                "Cannot tunefs: target {} is started",
                target.longtext()
            )),
            _ => Decision::Refuse(format!("Cannot tunefs: target {} is busy", target.longtext())),
        },
        TargetOp::Fsck => match target.state {
            Some(State::Offline) => Decision::Launch {
                cmd: fsck_command(target, opts),
                fanout,
            },
            Some(State::Mounted | State::Recovering) => Decision::Refuse(format!(
                "Cannot fsck: target {} is started",
                target.longtext()
            )),
            _ => Decision::Refuse(format!("Cannot fsck: target {} is busy", target.longtext())),
        },
        TargetOp::Start => match target.state {
            Some(State::Offline) => Decision::Launch {
                cmd: start_command(fs, target, opts),
                fanout,
            },
            Some(State::Mounted | State::Recovering) => {
                Decision::Succeed(Some(format!("{} is already started", target.label())))
            }
            other => Decision::Refuse(format!(
                "bad state `{}' for {}",
                other.map(|s| s.text()).unwrap_or("unknown"),
                target.label()
            )),
        },
        TargetOp::Stop => match target.state {
            Some(State::Offline) => {
                Decision::Succeed(Some(format!("{} is already stopped", target.label())))
            }
            _ => Decision::Launch {
                cmd: stop_command(target),
                fanout,
            },
        },
        TargetOp::Status => Decision::Succeed(None),
    }
}

fn success_state(op: TargetOp) -> SuccessState {
    match op {
        TargetOp::Format | TargetOp::Tunefs | TargetOp::Fsck => {
            SuccessState::Fixed(State::Offline)
        }
        // start/stop re-probe the kernel state so recovery is reflected.
        TargetOp::Start | TargetOp::Stop | TargetOp::Status => SuccessState::Probe,
    }
}

fn format_command(fs: &FileSystem, target: &Target, opts: &OpOptions) -> String {
    let mut cmd = format!("mkfs.lustre --reformat --fsname={}", target.fs_name);
    match target.kind {
        TargetKind::Mgt => cmd.push_str(" --mgs"),
        TargetKind::Mdt => cmd.push_str(" --mdt"),
        TargetKind::Ost => cmd.push_str(" --ost"),
    }
    if target.kind != TargetKind::Mgt {
        cmd.push_str(&format!(" --index={}", target.index));
        for nid in fs.mgs_nids() {
            cmd.push_str(&format!(" --mgsnode={nid}"));
        }
    }
    for server in &target.failservers {
        cmd.push_str(&format!(" --failnode={}", server.nid));
    }
    if let Some(journal) = &target.journal {
        cmd.push_str(&format!(
            " --mkfsoptions='-J device={}'",
            journal.dev.display()
        ));
    }
    if let Some(addopts) = &opts.addopts {
        cmd.push_str(&format!(" {addopts}"));
    }
    cmd.push_str(&format!(" {}", target.disk.dev.display()));
    cmd
}

fn tunefs_command(target: &Target, opts: &OpOptions) -> String {
    let mut cmd = "tunefs.lustre".to_string();
    if let Some(addopts) = &opts.addopts {
        cmd.push_str(&format!(" {addopts}"));
    }
    cmd.push_str(&format!(" {}", target.disk.dev.display()));
    cmd
}

fn fsck_command(target: &Target, opts: &OpOptions) -> String {
    let mut cmd = "e2fsck -f -p".to_string();
    if let Some(addopts) = &opts.addopts {
        cmd.push_str(&format!(" {addopts}"));
    }
    cmd.push_str(&format!(" {}", target.disk.dev.display()));
    cmd
}

fn start_command(fs: &FileSystem, target: &Target, opts: &OpOptions) -> String {
    let mount_point = fs.target_mount_point(target);
    let mut cmd = format!(
        "mkdir -p {} && mount -t lustre",
        mount_point.display()
    );
    if let Some(addopts) = &opts.addopts {
        cmd.push_str(&format!(" -o {addopts}"));
    }
    cmd.push_str(&format!(
        " {} {}",
        target.disk.dev.display(),
        mount_point.display()
    ));
    cmd
}

fn stop_command(target: &Target) -> String {
    format!("umount {}", target.disk.dev.display())
}

pub(crate) enum SuccessState {
    Fixed(State),
    /// Re-run the live probe to settle the final state.
    Probe,
}

/// Settles a target's state from the exit of its external tool.
pub(crate) struct ToolHandler {
    pub(crate) id: String,
    pub(crate) action: &'static str,
    pub(crate) success: SuccessState,
}

impl WorkerHandler for ToolHandler {
    fn ev_close(&mut self, fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        if report.did_timeout {
            fs.set_comp_state(&self.id, Some(State::RuntimeError));
            fs.comp_action_timeout(&self.id, self.action);
            return Ok(());
        }

        let rc = report.max_retcode().unwrap_or(-1);
        if rc == 0 {
            match &self.success {
                SuccessState::Fixed(state) => {
                    fs.set_comp_state(&self.id, Some(*state));
                    fs.comp_action_done(&self.id, self.action);
                }
                SuccessState::Probe => match fs.target_lustre_check(&self.id) {
                    Ok(()) => fs.comp_action_done(&self.id, self.action),
                    Err(err) => {
                        fs.comp_action_failed(&self.id, self.action, None, err.to_string())
                    }
                },
            }
        } else {
            let node = Server::hostname_short();
            let detail = report.node_buffer(&node).unwrap_or_default();
            let msg = if detail.is_empty() {
                format!("{} failed (rc={rc})", self.action)
            } else {
                format!("{} failed (rc={rc}): {detail}", self.action)
            };
            fs.set_comp_state(&self.id, Some(State::TargetError));
            fs.comp_action_failed(&self.id, self.action, Some(rc), msg);
        }
        Ok(())
    }
}
