// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Targets: components bound to a block device or regular file.

use crate::component::Mode;
use crate::disk::{Disk, DiskError};
use crate::event::ComponentSnapshot;
use crate::nodeset::NodeSet;
use crate::probe::Procfs;
use crate::server::Server;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed label of the single management target.
pub const MGS_LABEL: &str = "MGS";

/// The three server roles a target can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Management target: one per file system.
    Mgt,
    /// Metadata target.
    Mdt,
    /// Object storage target.
    Ost,
}

impl TargetKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mgt" => Some(TargetKind::Mgt),
            "mdt" => Some(TargetKind::Mdt),
            "ost" => Some(TargetKind::Ost),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Mgt => "mgt",
            TargetKind::Mdt => "mdt",
            TargetKind::Ost => "ost",
        }
    }

    pub fn tag_upper(self) -> &'static str {
        match self {
            TargetKind::Mgt => "MGT",
            TargetKind::Mdt => "MDT",
            TargetKind::Ost => "OST",
        }
    }
}

/// Start ordering of the component roles, resolved per invocation.
///
/// The default sequence brings the network role up first, then management,
/// then object storage before metadata. When a metadata target carries the
/// first-time or writeconf flag, [`StartOrders::swapped`] is used for that
/// invocation so metadata registers before object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOrders {
    pub router: u32,
    pub mgt: u32,
    pub ost: u32,
    pub mdt: u32,
    pub client: u32,
}

impl Default for StartOrders {
    fn default() -> Self {
        Self {
            router: 1,
            mgt: 2,
            ost: 3,
            mdt: 4,
            client: 5,
        }
    }
}

impl StartOrders {
    /// Ordering with the metadata and object-storage phases exchanged.
    pub fn swapped() -> Self {
        let base = Self::default();
        Self {
            ost: base.mdt,
            mdt: base.ost,
            ..base
        }
    }

    pub fn for_kind(&self, kind: TargetKind) -> u32 {
        match kind {
            TargetKind::Mgt => self.mgt,
            TargetKind::Mdt => self.mdt,
            TargetKind::Ost => self.ost,
        }
    }
}

/// Errors raised by target-level checks.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error("incoherent state in /proc/fs/lustre for {0}")]
    Incoherent(String),
    #[error("multiple mounts detected for {0}")]
    MultipleMounts(String),
    #[error("incoherent state for {0} (started but not mounted?)")]
    StartedNotMounted(String),
    #[error("recovery_status file not found for {0}")]
    RecoveryMissing(String),
    #[error("more than one failover server matches")]
    AmbiguousFailover,
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// A component bound to a backing device: management, metadata or object
/// storage service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub fs_name: String,
    pub kind: TargetKind,
    pub index: u32,
    /// Server the target currently runs on. Reassigned by
    /// [`Target::failover`].
    pub server: Server,
    pub defaultserver: Server,
    pub failservers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub enabled: bool,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_info: Option<String>,
    #[serde(default)]
    pub running_actions: Vec<String>,
    pub disk: Disk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<Disk>,
    /// Mount device read back from the kernel when the target is started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mntdev: Option<String>,
}

impl Target {
    pub fn new(
        fs_name: impl Into<String>,
        kind: TargetKind,
        index: u32,
        dev: impl Into<PathBuf>,
        server: Server,
    ) -> Self {
        Self {
            fs_name: fs_name.into(),
            kind,
            index,
            defaultserver: server.clone(),
            server,
            failservers: Vec::new(),
            group: None,
            tag: None,
            enabled: true,
            mode: Mode::Managed,
            state: None,
            status_info: None,
            running_actions: Vec::new(),
            disk: Disk::new(dev),
            journal: None,
            mntdev: None,
        }
    }

    /// Canonical target name: `<fs>-<TYPE><index:04x>`, except the single
    /// management target which is always `MGS`.
    pub fn label(&self) -> String {
        match self.kind {
            TargetKind::Mgt => MGS_LABEL.to_string(),
            kind => format!("{}-{}{:04x}", self.fs_name, kind.tag_upper(), self.index),
        }
    }

    /// Registry key: stable across failover (the label is unique within a
    /// file system, and the management label is global).
    pub fn uniqueid(&self) -> String {
        format!("{}:{}", self.fs_name, self.label())
    }

    /// Human readable identifier: the configured tag wins over the label.
    pub fn get_id(&self) -> String {
        self.tag.clone().unwrap_or_else(|| self.label())
    }

    /// Label plus backing device, for messages.
    pub fn longtext(&self) -> String {
        format!("{} ({})", self.label(), self.disk.dev.display())
    }

    pub fn add_server(&mut self, server: Server) {
        self.failservers.push(server);
    }

    /// All servers this target can run on: the default server first, then
    /// the failover candidates.
    pub fn allservers(&self) -> Vec<&Server> {
        std::iter::once(&self.defaultserver)
            .chain(self.failservers.iter())
            .collect()
    }

    /// Network identifiers of every server this target can run on.
    pub fn get_nids(&self) -> Vec<String> {
        self.allservers().iter().map(|s| s.nid.clone()).collect()
    }

    /// Reassign the current server from a candidate node set.
    ///
    /// Succeeds when exactly one failover server is in `candidates`. More
    /// than one match is ambiguous and fails; no match leaves the current
    /// server untouched and reports `false`.
    pub fn failover(&mut self, candidates: &NodeSet) -> Result<bool, TargetError> {
        let failnodes: NodeSet = self
            .failservers
            .iter()
            .map(|s| s.hostname.clone())
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        let matching = candidates.intersection(&failnodes);

        if matching.len() > 1 {
            return Err(TargetError::AmbiguousFailover);
        }
        if let Some(node) = matching.first() {
            if let Some(server) = self.failservers.iter().find(|s| s.hostname == node) {
                self.server = server.clone();
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn text_status(&self) -> String {
        match (self.state, &self.status_info) {
            (Some(State::Recovering), Some(info)) => {
                format!("{} for {}", State::Recovering.text(), info)
            }
            (Some(state), _) => state.text().to_string(),
            (None, _) => "unknown".to_string(),
        }
    }

    pub fn has_first_time_flag(&self) -> bool {
        self.disk.has_first_time_flag()
    }

    pub fn has_writeconf_flag(&self) -> bool {
        self.disk.has_writeconf_flag()
    }

    /// Classify the target from the kernel-exported state: started targets
    /// expose `mntdev` (and `recovery_status`) under the driver proc tree
    /// and appear in the mount table.
    pub fn lustre_check(&mut self, procfs: &Procfs) -> Result<(), TargetError> {
        self.state = None;

        let label = self.label();
        let mntdev_paths = glob_one(&procfs.lustre, &label, "mntdev", &label)?;
        let recovery_paths = glob_one(&procfs.lustre, &label, "recovery_status", &label)?;

        if mntdev_paths.is_none() && recovery_paths.is_none() {
            self.state = Some(State::Offline);
            return Ok(());
        }
        let Some(mntdev_path) = mntdev_paths else {
            // Recovery status without a mount device: the driver state is
            // inconsistent.
            self.state = Some(State::TargetError);
            return Err(TargetError::Incoherent(label));
        };

        let mntdev = read_first_line(&mntdev_path)?;
        self.mntdev = Some(mntdev.clone());

        let mounts = std::fs::read_to_string(&procfs.mounts).map_err(|source| TargetError::Io {
            path: procfs.mounts.clone(),
            source,
        })?;
        let mut matches = 0usize;
        let mut mounted = false;
        for line in mounts.lines() {
            let mut fields = line.split_whitespace();
            if fields.next() == Some(mntdev.as_str()) {
                matches += 1;
                // fields: device, mount point, fs type
                if fields.nth(1) == Some("lustre") {
                    mounted = true;
                }
            }
        }
        if matches > 1 {
            self.state = Some(State::TargetError);
            return Err(TargetError::MultipleMounts(label));
        }
        if !mounted {
            self.state = Some(State::TargetError);
            return Err(TargetError::StartedNotMounted(label));
        }
        self.state = Some(State::Mounted);

        // The management service performs no recovery.
        if self.kind != TargetKind::Mgt {
            let Some(recovery_path) = recovery_paths else {
                self.state = Some(State::TargetError);
                return Err(TargetError::RecoveryMissing(label));
            };
            self.check_recovery(&recovery_path)?;
        }
        Ok(())
    }

    /// Parse `recovery_status` and refine the state of a mounted target.
    fn check_recovery(&mut self, path: &Path) -> Result<(), TargetError> {
        let content = std::fs::read_to_string(path).map_err(|source| TargetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut status = "";
        let mut recovery_duration = "-1";
        let mut completed_clients = "-1";
        let mut time_remaining = "-1";
        for line in content.lines() {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("status:") => status = fields.next().unwrap_or(""),
                Some("recovery_duration:") => {
                    recovery_duration = fields.next().unwrap_or("-1");
                }
                Some("completed_clients:") => {
                    completed_clients = fields.next().unwrap_or("-1");
                }
                Some("time_remaining:") => time_remaining = fields.next().unwrap_or("-1"),
                _ => {}
            }
        }

        match status {
            "COMPLETE" => {
                self.status_info = Some(format!("{recovery_duration}s ({completed_clients})"));
            }
            "RECOVERING" => {
                self.state = Some(State::Recovering);
                self.status_info = Some(format!("{time_remaining}s ({completed_clients})"));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ComponentSnapshot {
        ComponentSnapshot {
            compname: "target".to_string(),
            uniqueid: self.uniqueid(),
            label: self.label(),
            state: self.state,
            status_info: self.status_info.clone(),
            index: Some(self.index),
            disk: Some(self.disk.clone()),
        }
    }

    /// Reconcile a distant report into this instance.
    pub fn update_from(&mut self, snap: &ComponentSnapshot) {
        self.state = snap.state;
        self.status_info.clone_from(&snap.status_info);
        if let Some(index) = snap.index {
            self.index = index;
        }
        if let Some(disk) = &snap.disk {
            self.disk.update_from(disk);
        }
    }
}

/// Glob `<lustre>/*/<label>/<leaf>`, requiring at most one match.
fn glob_one(
    lustre: &Path,
    label: &str,
    leaf: &str,
    errlabel: &str,
) -> Result<Option<PathBuf>, TargetError> {
    let pattern = format!("{}/*/{}/{}", lustre.display(), label, leaf);
    let mut found: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(_) => Vec::new(),
    };
    if found.len() > 1 {
        return Err(TargetError::Incoherent(errlabel.to_string()));
    }
    Ok(found.pop())
}

fn read_first_line(path: &Path) -> Result<String, TargetError> {
    let content = std::fs::read_to_string(path).map_err(|source| TargetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().next().unwrap_or("").to_string())
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
