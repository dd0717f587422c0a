// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered sets of node hostnames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An ordered, duplicate-free set of node hostnames.
///
/// Displays as a comma-separated list, which is also the accepted parse
/// format (`"n1,n2,n3"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet(BTreeSet<String>);

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single node.
    pub fn single(node: impl Into<String>) -> Self {
        let mut set = Self::new();
        set.insert(node);
        set
    }

    pub fn insert(&mut self, node: impl Into<String>) {
        self.0.insert(node.into());
    }

    pub fn contains(&self, node: &str) -> bool {
        self.0.contains(node)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.iter().next().map(String::as_str)
    }

    pub fn union_with(&mut self, other: &NodeSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet(self.0.intersection(&other.0).cloned().collect())
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for node in &self.0 {
            write!(f, "{sep}{node}")?;
            sep = ",";
        }
        Ok(())
    }
}

impl From<&str> for NodeSet {
    fn from(spec: &str) -> Self {
        spec.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

impl FromIterator<String> for NodeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        NodeSet(iter.into_iter().collect())
    }
}

impl Extend<String> for NodeSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "nodeset_tests.rs"]
mod tests;
