// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-wide settings, loaded from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings shared by every operation of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding per-file-system configuration files
    /// (`<conf_dir>/<fsname>.xmf`).
    pub conf_dir: PathBuf,
    /// Connect timeout, in seconds, applied to every remote shell.
    pub ssh_connect_timeout: u64,
    /// Maximum concurrent remote shells per action.
    pub ssh_fanout: usize,
    /// Whole-run timeout, in seconds. Zero disables it.
    pub run_timeout: u64,
    /// Where target mount points are created.
    pub mount_prefix: PathBuf,
    /// Optional tuning configuration, installed on servers before `tune`.
    pub tuning_file: Option<PathBuf>,
    /// Path of this tool on remote nodes. Defaults to the local binary
    /// path.
    pub command_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("/etc/shine"),
            ssh_connect_timeout: 30,
            ssh_fanout: 64,
            run_timeout: 0,
            mount_prefix: PathBuf::from("/mnt"),
            tuning_file: None,
            command_path: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-file-system configuration file pushed to servers.
    pub fn fs_conf_file(&self, fs_name: &str) -> PathBuf {
        self.conf_dir.join(format!("{fs_name}.xmf"))
    }
}
