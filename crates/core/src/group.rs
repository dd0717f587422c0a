// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The component registry and its grouping helpers.

use crate::component::Component;
use crate::nodeset::NodeSet;
use crate::server::Server;
use crate::target::StartOrders;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("component '{0}' is already defined")]
    Duplicate(String),
}

/// Registry of the components of one file system, keyed by `uniqueid`.
///
/// Selections are id lists so that callers can hold several overlapping
/// groupings while keeping a single mutable home for each component.
#[derive(Debug, Default)]
pub struct ComponentGroup {
    comps: BTreeMap<String, Component>,
}

impl ComponentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component, refusing duplicates.
    pub fn add(&mut self, comp: Component) -> Result<String, GroupError> {
        let id = comp.uniqueid();
        if self.comps.contains_key(&id) {
            return Err(GroupError::Duplicate(id));
        }
        self.comps.insert(id.clone(), comp);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.comps.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.comps.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.comps.values()
    }

    pub fn len(&self) -> usize {
        self.comps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.comps.keys().cloned().collect()
    }

    /// Ids of enabled components that are not in external mode and,
    /// optionally, support a given operation.
    pub fn managed(&self, supports: Option<&str>) -> Vec<String> {
        self.comps
            .iter()
            .filter(|(_, c)| c.enabled() && !c.is_external())
            .filter(|(_, c)| supports.map_or(true, |op| c.supports(op)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Group a selection by its current server.
    pub fn by_server(&self, ids: &[String]) -> Vec<(Server, Vec<String>)> {
        let mut buckets: BTreeMap<String, (Server, Vec<String>)> = BTreeMap::new();
        for id in ids {
            if let Some(comp) = self.comps.get(id) {
                let server = comp.server();
                buckets
                    .entry(server.hostname.clone())
                    .or_insert_with(|| (server.clone(), Vec::new()))
                    .1
                    .push(id.clone());
            }
        }
        buckets.into_values().collect()
    }

    /// Group a selection by start order, ascending (or descending when
    /// `reverse` is set).
    pub fn by_start_order(
        &self,
        ids: &[String],
        orders: &StartOrders,
        reverse: bool,
    ) -> Vec<(u32, Vec<String>)> {
        let mut buckets: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for id in ids {
            if let Some(comp) = self.comps.get(id) {
                buckets
                    .entry(comp.start_order(orders))
                    .or_default()
                    .push(id.clone());
            }
        }
        let mut phases: Vec<(u32, Vec<String>)> = buckets.into_iter().collect();
        if reverse {
            phases.reverse();
        }
        phases
    }

    /// Current servers of a selection.
    pub fn servers(&self, ids: &[String]) -> NodeSet {
        let mut nodes = NodeSet::new();
        for id in ids {
            if let Some(comp) = self.comps.get(id) {
                nodes.insert(comp.server().hostname.clone());
            }
        }
        nodes
    }

    /// All servers a selection can ever run on, failover candidates
    /// included.
    pub fn allservers(&self, ids: &[String]) -> NodeSet {
        let mut nodes = NodeSet::new();
        for id in ids {
            if let Some(comp) = self.comps.get(id) {
                nodes.insert(comp.server().hostname.clone());
                if let Some(target) = comp.as_target() {
                    for server in target.allservers() {
                        nodes.insert(server.hostname.clone());
                    }
                }
            }
        }
        nodes
    }

    /// Comma-separated labels of a selection, for remote command lines.
    pub fn labels(&self, ids: &[String]) -> String {
        let labels: Vec<String> = ids
            .iter()
            .filter_map(|id| self.comps.get(id).map(Component::label))
            .collect();
        labels.join(",")
    }

    /// Ids of the selection whose label is in a comma-separated list.
    pub fn select_labels(&self, ids: &[String], labels: &str) -> Vec<String> {
        let wanted: Vec<&str> = labels.split(',').map(str::trim).collect();
        ids.iter()
            .filter(|id| {
                self.comps
                    .get(*id)
                    .map(|c| wanted.contains(&c.label().as_str()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
