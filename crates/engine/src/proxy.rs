// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy actions: run this tool on distant servers and funnel the framed
//! event stream back into the local model.

use crate::action::{WorkerHandler, WorkerReport};
use crate::fs::{FileSystem, MountdataPolicy, OpOptions};
use crate::FsError;
use shine_core::{NodeSet, State};
use shine_proto::UnpackError;
use std::collections::BTreeMap;

/// One remote invocation over a node set, plus the stream parser feeding
/// distant events into the caller's component registry.
pub(crate) struct ProxyAction {
    action: String,
    comp_ids: Option<Vec<String>>,
    /// Plain output lines (not framed events), per node.
    outputs: BTreeMap<String, Vec<String>>,
    /// Undecodable framed messages, deduplicated per node.
    decode_errors: BTreeMap<String, Vec<String>>,
    /// Nodes that failed without producing any plain output.
    silent_nodes: NodeSet,
}

impl ProxyAction {
    pub(crate) fn new(action: impl Into<String>, comp_ids: Option<Vec<String>>) -> Self {
        Self {
            action: action.into(),
            comp_ids,
            outputs: BTreeMap::new(),
            decode_errors: BTreeMap::new(),
            silent_nodes: NodeSet::new(),
        }
    }

    /// Build the remote command line.
    ///
    /// The shape is kept stable for older peers: `--mountdata` is omitted
    /// at its default so peers that predate the flag never see it.
    pub(crate) fn command(fs: &FileSystem, action: &str, labels: Option<&str>, opts: &OpOptions) -> String {
        let bin = fs.command_path();
        let mut cmd = format!("{} {} -f {} -R", bin.display(), action, fs.fs_name);
        if fs.debug {
            cmd.push_str(" -d");
        }
        if let Some(labels) = labels {
            cmd.push_str(&format!(" -l {labels}"));
        }
        if let Some(addopts) = &opts.addopts {
            cmd.push_str(&format!(" -o '{addopts}'"));
        }
        if let Some(failover) = &opts.failover {
            cmd.push_str(&format!(" -F '{failover}'"));
        }
        match opts.mountdata {
            MountdataPolicy::Auto => {}
            MountdataPolicy::Never => cmd.push_str(" --mountdata=never"),
            MountdataPolicy::Always => cmd.push_str(" --mountdata=always"),
        }
        cmd
    }
}

impl WorkerHandler for ProxyAction {
    fn ev_read(&mut self, fs: &mut FileSystem, node: &str, line: &str) {
        match shine_proto::unpack(line) {
            Ok(msg) => {
                fs.distant_event(&msg.compname, &msg.action, &msg.status, node, msg.comp, msg.result);
            }
            Err(UnpackError::MissingPrefix) => {
                // Not a framed event: plain command output.
                self.outputs
                    .entry(node.to_string())
                    .or_default()
                    .push(line.to_string());
            }
            Err(err) => {
                let text = err.to_string();
                let bucket = self.decode_errors.entry(node.to_string()).or_default();
                if !bucket.contains(&text) {
                    bucket.push(text);
                }
            }
        }
    }

    fn ev_hup(&mut self, _fs: &mut FileSystem, node: &str, rc: i32) {
        if rc != 0 && !self.outputs.contains_key(node) {
            self.silent_nodes.insert(node);
        }
    }

    fn ev_close(&mut self, fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        // A global timeout leaves component states as-is; the aggregate
        // check coerces unresolved states afterwards.
        if report.did_timeout {
            return Ok(());
        }

        if let Some(ids) = &self.comp_ids {
            for id in ids {
                let Some(comp) = fs.components.get_mut(id) else {
                    continue;
                };
                comp.del_action("proxy");

                match comp.state() {
                    None => comp.set_state(Some(State::RuntimeError)),
                    Some(State::InProgress) => {
                        // In-progress past a completed run is a peer bug.
                        tracing::error!(
                            label = %comp.label(),
                            actions = ?comp.running_actions(),
                            "in-progress state leaked past a proxy run"
                        );
                        comp.set_state(Some(State::RuntimeError));
                    }
                    _ => {}
                }
            }
        }

        for (rc, nodes) in report.iter_retcodes() {
            if rc == 0 {
                continue;
            }
            // Group the failing nodes by identical output so one message
            // covers a whole set of nodes failing the same way.
            let mut by_buffer: BTreeMap<String, NodeSet> = BTreeMap::new();
            for node in nodes.iter() {
                if let Some(lines) = self.outputs.get(node) {
                    by_buffer
                        .entry(lines.join("\n"))
                        .or_default()
                        .insert(node);
                }
            }
            for (buffer, nodes) in by_buffer {
                let msg = format!("Remote action {} failed: {}", self.action, buffer);
                fs.report_proxy_error(nodes, msg);
            }
        }

        // Same grouping for decode errors: they can happen on nodes that
        // still exited 0.
        let mut by_error: BTreeMap<String, NodeSet> = BTreeMap::new();
        for (node, errors) in &self.decode_errors {
            for error in errors {
                by_error.entry(error.clone()).or_default().insert(node.clone());
            }
        }
        for (error, nodes) in by_error {
            fs.report_proxy_error(nodes, error);
        }

        if !self.silent_nodes.is_empty() {
            let msg = format!("Remote action {} failed: No response", self.action);
            fs.report_proxy_error(self.silent_nodes.clone(), msg);
        }

        Ok(())
    }
}
