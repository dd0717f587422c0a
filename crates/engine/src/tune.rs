// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server tuning.
//!
//! A tuning model is a list of kernel parameters with the role profiles
//! they apply to. The merged profile set of every component hosted on a
//! server is applied in one local action per server.

use crate::action::{Launched, LocalAction};
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One tunable kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningEntry {
    /// Path of the parameter file. `{fsname}` expands to the file system
    /// name.
    pub parameter: String,
    pub value: String,
    /// Role profiles this entry applies to: `mgs`, `mds`, `oss`, `client`,
    /// `router`.
    pub profiles: Vec<String>,
}

/// The tuning configuration applied by the `tune` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningModel {
    #[serde(default)]
    pub entries: Vec<TuningEntry>,
}

impl TuningModel {
    /// Entries applying to at least one of the given profiles.
    pub fn for_profiles<'a>(&'a self, profiles: &BTreeSet<String>) -> Vec<&'a TuningEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.profiles.iter().any(|p| profiles.contains(p)))
            .collect()
    }
}

/// Apply the merged tuning profiles of one server.
pub(crate) struct ApplyTuning {
    pub(crate) profiles: BTreeSet<String>,
    pub(crate) model: TuningModel,
}

#[async_trait::async_trait]
impl LocalAction for ApplyTuning {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched {
        let mut failures = 0usize;
        for entry in self.model.for_profiles(&self.profiles) {
            let path = entry.parameter.replace("{fsname}", &fs.fs_name);
            if let Err(err) = std::fs::write(&path, &entry.value) {
                tracing::warn!(parameter = %path, error = %err, "cannot apply tuning parameter");
                failures += 1;
            }
        }
        if failures > 0 {
            fs.report_proxy_error(
                shine_core::NodeSet::single(shine_core::Server::hostname_short()),
                format!("tune failed: {failures} parameter(s) not applied"),
            );
        }
        Launched::Done
    }
}
