// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clients: hosts mounting the file system.

use crate::component::Mode;
use crate::event::ComponentSnapshot;
use crate::probe::Procfs;
use crate::server::Server;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// A host mounting the file system at a configured path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub fs_name: String,
    pub server: Server,
    pub mount_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_options: Option<String>,
    pub enabled: bool,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_info: Option<String>,
    #[serde(default)]
    pub running_actions: Vec<String>,
}

impl Client {
    pub fn new(
        fs_name: impl Into<String>,
        server: Server,
        mount_path: impl Into<PathBuf>,
        mount_options: Option<String>,
    ) -> Self {
        Self {
            fs_name: fs_name.into(),
            server,
            mount_path: mount_path.into(),
            mount_options,
            enabled: true,
            mode: Mode::Managed,
            state: None,
            status_info: None,
            running_actions: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}-client", self.fs_name)
    }

    /// Clients are per-host: the registry key includes the server.
    pub fn uniqueid(&self) -> String {
        format!("{}@{}", self.label(), self.server.hostname)
    }

    /// Classify the client from the mount table: mounted at the configured
    /// path with the expected file system type, or offline.
    pub fn mount_check(&mut self, procfs: &Procfs) -> Result<(), ClientError> {
        let mounts = std::fs::read_to_string(&procfs.mounts).map_err(|source| ClientError::Io {
            path: procfs.mounts.clone(),
            source,
        })?;
        self.state = Some(State::Offline);
        let wanted: &Path = &self.mount_path;
        for line in mounts.lines() {
            let mut fields = line.split_whitespace();
            let _dev = fields.next();
            if fields.next().map(Path::new) == Some(wanted) && fields.next() == Some("lustre") {
                self.state = Some(State::Mounted);
                break;
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ComponentSnapshot {
        ComponentSnapshot {
            compname: "client".to_string(),
            uniqueid: self.uniqueid(),
            label: self.label(),
            state: self.state,
            status_info: self.status_info.clone(),
            index: None,
            disk: None,
        }
    }

    pub fn update_from(&mut self, snap: &ComponentSnapshot) {
        self.state = snap.state;
        self.status_info.clone_from(&snap.status_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ProcfsFixture;

    fn client() -> Client {
        Client::new(
            "lustre",
            Server::with_default_nid("login1"),
            "/lustre",
            None,
        )
    }

    #[test]
    fn label_and_uniqueid() {
        let cli = client();
        assert_eq!(cli.label(), "lustre-client");
        assert_eq!(cli.uniqueid(), "lustre-client@login1");
    }

    #[test]
    fn mount_check_offline() {
        let fx = ProcfsFixture::new().unwrap();
        let mut cli = client();
        cli.mount_check(&fx.procfs).unwrap();
        assert_eq!(cli.state, Some(State::Offline));
    }

    #[test]
    fn mount_check_mounted() {
        let fx = ProcfsFixture::new().unwrap();
        fx.add_mount("mgs@tcp:/lustre", "/lustre", "lustre").unwrap();
        let mut cli = client();
        cli.mount_check(&fx.procfs).unwrap();
        assert_eq!(cli.state, Some(State::Mounted));
    }

    #[test]
    fn mount_check_ignores_other_fstype() {
        let fx = ProcfsFixture::new().unwrap();
        fx.add_mount("/dev/sda1", "/lustre", "ext4").unwrap();
        let mut cli = client();
        cli.mount_check(&fx.procfs).unwrap();
        assert_eq!(cli.state, Some(State::Offline));
    }
}
