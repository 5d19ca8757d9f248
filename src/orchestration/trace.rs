//! Append-only execution trace for one run.
//!
//! Top-level entries form a flat list. A top-level entry may additionally
//! carry named lists of nested entries (the orchestrator uses the `"flow"`
//! field while unrolling a flow). Nested lists only ever grow on the most
//! recently added top-level entry, tracked by index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TraceError;

/// Field name under which flow member entries are nested.
pub const FLOW_FIELD: &str = "flow";

/// One recorded step: a decision or a remote worker call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub input: Value,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    pub success: bool,
    #[serde(flatten)]
    pub nested: BTreeMap<String, Vec<TraceEntry>>,
}

impl TraceEntry {
    pub fn new(name: impl Into<String>, input: Value, output: Value, success: bool) -> Self {
        Self {
            id: None,
            name: name.into(),
            input,
            output,
            elapsed_seconds: None,
            success,
            nested: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_elapsed(mut self, seconds: f64) -> Self {
        self.elapsed_seconds = Some(seconds);
        self
    }

    /// Nested entries under `field`, empty if none were recorded.
    pub fn nested(&self, field: &str) -> &[TraceEntry] {
        self.nested.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Accumulates the trace of a single run.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    entries: Vec<TraceEntry>,
    last_top_level: Option<usize>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_top_level(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
        self.last_top_level = Some(self.entries.len() - 1);
    }

    /// Append `entry` to the `field` list of the most recent top-level entry,
    /// creating the list on first use.
    pub fn add_nested(&mut self, field: &str, entry: TraceEntry) -> Result<(), TraceError> {
        let index = self.last_top_level.ok_or_else(|| TraceError::NoParentEntry {
            field: field.to_string(),
        })?;
        self.entries[index]
            .nested
            .entry(field.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(name: &str) -> TraceEntry {
        TraceEntry::new(name, json!({}), json!(null), true)
    }

    #[test]
    fn nested_without_parent_fails() {
        let mut recorder = TraceRecorder::new();
        let err = recorder.add_nested(FLOW_FIELD, entry("A")).unwrap_err();
        assert_eq!(
            err,
            TraceError::NoParentEntry {
                field: "flow".to_string()
            }
        );
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn nested_entries_attach_to_latest_top_level_entry() {
        let mut recorder = TraceRecorder::new();
        recorder.add_top_level(entry("first"));
        recorder.add_top_level(entry("second"));
        recorder.add_nested(FLOW_FIELD, entry("A")).unwrap();
        recorder.add_nested(FLOW_FIELD, entry("B")).unwrap();

        let entries = recorder.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].nested.is_empty());
        let names: Vec<_> = entries[1].nested(FLOW_FIELD).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn nested_list_is_flattened_under_its_field_name() {
        let mut recorder = TraceRecorder::new();
        recorder.add_top_level(entry("F").with_id("flow-1"));
        recorder
            .add_nested(FLOW_FIELD, entry("A").with_id("a").with_elapsed(0.5))
            .unwrap();

        let value = serde_json::to_value(recorder.entries()).unwrap();
        assert_eq!(value[0]["id"], "flow-1");
        assert_eq!(value[0]["flow"][0]["name"], "A");
        assert_eq!(value[0]["flow"][0]["elapsed_seconds"], 0.5);
        assert!(value[0].get("elapsed_seconds").is_none());
        assert!(value[0]["flow"][0].get("flow").is_none());
    }
}
