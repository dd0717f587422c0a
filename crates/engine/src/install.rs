// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pushing configuration files onto servers.
//!
//! Unlike the lifecycle operations this is a synchronous, direct worker:
//! any timeout or non-zero exit turns into a single [`FsError::Remote`]
//! naming the offending node set.

use crate::action::{WorkerHandler, WorkerReport};
use crate::fs::FileSystem;
use crate::FsError;
use shine_core::NodeSet;

pub(crate) struct InstallHandler {
    pub(crate) description: String,
}

impl WorkerHandler for InstallHandler {
    fn ev_close(&mut self, _fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        let mut err_nodes = NodeSet::new();
        let mut err_rc = 0;
        let mut err_txt = String::new();

        if report.did_timeout {
            err_nodes.union_with(report.iter_timeouts());
            err_rc = -1;
            err_txt = "Node timed out".to_string();
        }

        if let Some(max) = report.max_retcode() {
            if max > 0 {
                for (rc, nodes) in report.iter_retcodes() {
                    if rc > 0 {
                        err_nodes.union_with(&nodes);
                    }
                }
                err_rc = max;
                err_txt = err_nodes
                    .first()
                    .and_then(|node| report.node_buffer(node))
                    .unwrap_or_else(|| format!("{} failed", self.description));
            }
        }

        if err_nodes.is_empty() {
            Ok(())
        } else {
            Err(FsError::Remote {
                nodes: err_nodes,
                rc: err_rc,
                message: err_txt,
            })
        }
    }
}
