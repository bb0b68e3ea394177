//! Command-to-group routing
//!
//! The router is a deterministic, pure, total function over a static command
//! table. An absent or unrecognized command engages every group: over-inclusion
//! is the conservative default, so a novel request is never silently starved
//! of analysis. A recognized command maps to its fixed subset, which may be
//! empty (the orchestrator turns that into `NoGroupsSelected`).

use crate::error::{Error, Result};
use crate::group::Group;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Static command table mapping intents to group subsets
#[derive(Debug, Clone, Default)]
pub struct Router {
    table: HashMap<String, Vec<String>>,
}

impl Router {
    /// Create a router with an empty table (every command engages all groups)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router from a command table
    ///
    /// Keys are normalized to lowercase; matching is case-insensitive.
    pub fn from_table(table: HashMap<String, Vec<String>>) -> Self {
        let table = table
            .into_iter()
            .map(|(command, groups)| (normalize(&command), groups))
            .collect();
        Self { table }
    }

    /// Add one command route
    pub fn with_route<I, S>(mut self, command: impl AsRef<str>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table.insert(
            normalize(command.as_ref()),
            groups.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Fail fast if any route references a group name not in `known`
    pub fn validate(&self, known: &HashSet<&str>) -> Result<()> {
        for (command, groups) in &self.table {
            for name in groups {
                if !known.contains(name.as_str()) {
                    return Err(Error::config(format!(
                        "route {command:?} references unknown group {name:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Select the groups to engage for this command
    ///
    /// Total: never errors, and any command outside the table (including
    /// absent and blank) falls back to the full group list. Selection
    /// preserves registration order.
    pub fn select(&self, command: Option<&str>, groups: &[Arc<Group>]) -> Vec<Arc<Group>> {
        let normalized = command.map(normalize).filter(|c| !c.is_empty());

        let selected = match normalized.and_then(|c| self.table.get(&c)) {
            Some(names) => {
                let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
                groups
                    .iter()
                    .filter(|g| wanted.contains(g.name()))
                    .cloned()
                    .collect()
            }
            None => groups.to_vec(),
        };

        debug!(
            command = ?command,
            selected = selected.len(),
            total = groups.len(),
            "routed command"
        );
        selected
    }
}

fn normalize(command: &str) -> String {
    command.trim().to_lowercase()
}
