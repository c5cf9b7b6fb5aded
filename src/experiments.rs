use std::collections::HashMap;
use std::sync::OnceLock;

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{RewriteError, RewriteResult};

/// Live experiment rollouts, normally initialized once when the process starts.
static LIVE_EXPERIMENTS: OnceLock<ExperimentTable> = OnceLock::new();

/// Rollout state of one experiment: for what percentage of jobs the
/// experiment is turned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentEntry {
    pub rollout_percent: u64,
}

/// Mapping of experiment identifier to rollout percentage.
///
/// Read-only during request handling; the selector takes it as an explicit
/// argument so bucketing stays testable in isolation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ExperimentTable {
    entries: HashMap<String, ExperimentEntry>,
}

impl ExperimentTable {
    pub fn new() -> ExperimentTable {
        ExperimentTable::default()
    }

    pub fn from_entries<I>(entries: I) -> RewriteResult<ExperimentTable>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut table = ExperimentTable::new();
        for (name, rollout_percent) in entries {
            table.insert(name, rollout_percent)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: impl Into<String>, rollout_percent: u64) -> RewriteResult<()> {
        let name = name.into();
        if rollout_percent > 100 {
            return Err(RewriteError::bad_input(format!(
                "rollout percentage {rollout_percent} of experiment {name:?} is out of range 0..=100"
            )));
        }
        self.entries.insert(name, ExperimentEntry { rollout_percent });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ExperimentEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in stable order of experiment identifier, so that selection
    /// output is deterministic regardless of map internals.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, ExperimentEntry)> {
        self.entries
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(name, entry)| (name.as_str(), *entry))
    }

    /// Checks all rollout percentages, for tables built through `Deserialize`
    /// which bypasses `insert`.
    pub fn validate(&self) -> RewriteResult<()> {
        for (name, entry) in &self.entries {
            if entry.rollout_percent > 100 {
                return Err(RewriteError::bad_input(format!(
                    "rollout percentage {} of experiment {name:?} is out of range 0..=100",
                    entry.rollout_percent
                )));
            }
        }
        Ok(())
    }
}

/// Initializes the process-wide experiment table. Must only be called once at
/// startup; a second call logs a warning and discards the values.
pub fn init_live_experiments(table: ExperimentTable) -> RewriteResult<()> {
    table.validate()?;
    if LIVE_EXPERIMENTS.set(table).is_err() {
        log::warn!("Live experiments already initialized!");
    }
    Ok(())
}

/// Returns the configured process-wide experiment table.
///
/// An empty table is the documented default when nothing was initialized.
pub fn live_experiments() -> ExperimentTable {
    LIVE_EXPERIMENTS.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_rollout() {
        let mut table = ExperimentTable::new();
        assert!(table.insert("inject_prefetch", 101).is_err());
        assert!(table.insert("inject_prefetch", 100).is_ok());
        assert!(table.insert("disable_intra_op_parallelism", 0).is_ok());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn validate_catches_deserialized_out_of_range_entries() {
        let table: ExperimentTable =
            serde_json::from_str(r#"{"bad": {"rollout_percent": 250}}"#).unwrap();
        assert!(table.validate().is_err());
    }

    #[test]
    fn iterates_in_identifier_order() {
        let table = ExperimentTable::from_entries([
            ("b".to_string(), 10),
            ("a".to_string(), 20),
            ("c".to_string(), 30),
        ])
        .unwrap();
        let names: Vec<_> = table.iter_sorted().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn uninitialized_table_is_empty() {
        // Ensure we properly fall back and don't crash on empty state
        assert!(live_experiments().is_empty());
    }
}
