// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identity for servers hosting file system components.

use crate::nodeset::NodeSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A host a component can run on: short hostname plus network identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub hostname: String,
    /// Network identifier used when pointing peers at this server,
    /// e.g. `oss12@tcp`.
    pub nid: String,
}

impl Server {
    pub fn new(hostname: impl Into<String>, nid: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            nid: nid.into(),
        }
    }

    /// Build a server whose nid is derived from the hostname on the default
    /// network (`<hostname>@tcp`).
    pub fn with_default_nid(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let nid = format!("{hostname}@tcp");
        Self { hostname, nid }
    }

    /// Short hostname of the machine we are running on.
    pub fn hostname_short() -> String {
        let name = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        name.split('.').next().unwrap_or("localhost").to_string()
    }

    /// Whether this server is the local machine.
    pub fn is_local(&self) -> bool {
        self.hostname == Self::hostname_short()
    }

    /// Filter a node set down to the servers that are not the local machine.
    pub fn distant_servers(servers: &NodeSet) -> NodeSet {
        let local = Self::hostname_short();
        servers
            .iter()
            .filter(|node| **node != local)
            .map(String::from)
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for Server {
    /// Prints the hostname only; the nid is an addressing detail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostname)
    }
}
