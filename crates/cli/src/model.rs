// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-file-system model file.
//!
//! `<conf_dir>/<fsname>.xmf` describes the components of one file system.
//! The orchestrator never reads this file itself; this front-end parses it
//! and builds the component registry from it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shine_core::{Mode, Server, Settings};
use shine_engine::{FileSystem, TargetOpts};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetModel {
    server: String,
    #[serde(default)]
    nid: Option<String>,
    #[serde(default)]
    index: u32,
    dev: String,
    #[serde(default)]
    jdev: Option<PathBuf>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    failservers: Vec<String>,
}

impl TargetModel {
    fn server(&self) -> Server {
        match &self.nid {
            Some(nid) => Server::new(&self.server, nid),
            None => Server::with_default_nid(&self.server),
        }
    }

    fn opts(&self) -> TargetOpts {
        TargetOpts {
            jdev: self.jdev.clone(),
            group: self.group.clone(),
            tag: self.tag.clone(),
            enabled: self.enabled,
            mode: self.mode,
            failservers: self
                .failservers
                .iter()
                .map(Server::with_default_nid)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClientModel {
    server: String,
    mount_path: String,
    #[serde(default)]
    mount_options: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    mode: Mode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouterModel {
    server: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    mode: Mode,
}

/// The file system description parsed from the model file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FsModel {
    #[serde(default)]
    mgt: Option<TargetModel>,
    #[serde(default)]
    mdt: Vec<TargetModel>,
    #[serde(default)]
    ost: Vec<TargetModel>,
    #[serde(default)]
    client: Vec<ClientModel>,
    #[serde(default)]
    router: Vec<RouterModel>,
}

/// Load `<conf_dir>/<fsname>.xmf` and build the file system it describes.
pub fn load_fs(fs_name: &str, settings: &Settings) -> Result<FileSystem> {
    let path = settings.fs_conf_file(fs_name);
    load_fs_from(fs_name, settings, &path)
}

pub fn load_fs_from(fs_name: &str, settings: &Settings, path: &Path) -> Result<FileSystem> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read model file {}", path.display()))?;
    let model: FsModel = toml::from_str(&raw)
        .with_context(|| format!("invalid model file {}", path.display()))?;

    let mut fs = FileSystem::new(fs_name, settings.clone());

    if let Some(mgt) = &model.mgt {
        fs.new_target(mgt.server(), "mgt", mgt.index, &mgt.dev, mgt.opts())?;
    }
    for (kind, targets) in [("mdt", &model.mdt), ("ost", &model.ost)] {
        for target in targets {
            fs.new_target(target.server(), kind, target.index, &target.dev, target.opts())?;
        }
    }
    for client in &model.client {
        fs.new_client(
            Server::with_default_nid(&client.server),
            &client.mount_path,
            client.mount_options.clone(),
            client.enabled,
            client.mode,
        )?;
    }
    for router in &model.router {
        fs.new_router(Server::with_default_nid(&router.server), router.enabled, router.mode)?;
    }

    if fs.components.is_empty() {
        bail!("model file {} describes no component", path.display());
    }
    Ok(fs)
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
