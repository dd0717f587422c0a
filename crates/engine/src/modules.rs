// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel module load/unload on the local server.
//!
//! Module failures are logged but do not gate the operation; the targets
//! depending on the modules fail on their own.

use crate::action::{Launched, LocalAction, WorkerHandler, WorkerReport};
use crate::fs::FileSystem;
use crate::FsError;
use shine_core::{NodeSet, Server};

pub(crate) struct LoadModules;

#[async_trait::async_trait]
impl LocalAction for LoadModules {
    async fn launch(&mut self, _fs: &mut FileSystem) -> Launched {
        Launched::Shell {
            cmd: "modprobe lustre".to_string(),
            nodes: NodeSet::single(Server::hostname_short()),
            fanout: None,
            handler: Box::new(ModuleHandler { verb: "load" }),
        }
    }
}

pub(crate) struct UnloadModules;

#[async_trait::async_trait]
impl LocalAction for UnloadModules {
    async fn launch(&mut self, _fs: &mut FileSystem) -> Launched {
        Launched::Shell {
            cmd: "lustre_rmmod".to_string(),
            nodes: NodeSet::single(Server::hostname_short()),
            fanout: None,
            handler: Box::new(ModuleHandler { verb: "unload" }),
        }
    }
}

struct ModuleHandler {
    verb: &'static str,
}

impl WorkerHandler for ModuleHandler {
    fn ev_close(&mut self, _fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        match report.max_retcode() {
            Some(0) | None => {}
            Some(rc) => {
                tracing::warn!(rc, "cannot {} kernel modules", self.verb);
            }
        }
        Ok(())
    }
}
