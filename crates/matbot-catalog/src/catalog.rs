//! In-memory catalog and its document encoding
//!
//! The on-disk document is a JSON object keyed by the decimal task number,
//! each value an ordered array of `[kind, external_id]` pairs:
//!
//! ```json
//! { "5": [["document", "BQAC..."], ["video", "BAAC..."]] }
//! ```
//!
//! Decoding is tolerant: entries that cannot be understood are skipped and
//! reported back as [`SkippedEntry`] values instead of failing the whole load.

use crate::types::{MediaKind, MediaReference, TaskId};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from task to its ordered media references
///
/// Insertion order is display order. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<TaskId, Vec<MediaReference>>,
}

impl Catalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append reference to the end of a task's sequence
    pub fn push(&mut self, task: TaskId, reference: MediaReference) {
        self.entries.entry(task).or_default().push(reference);
    }

    /// References stored for a task, empty if none
    #[inline]
    #[must_use]
    pub fn get(&self, task: TaskId) -> &[MediaReference] {
        self.entries.get(&task).map(Vec::as_slice).unwrap_or_default()
    }

    /// References stored for a raw task number
    ///
    /// Out-of-range numbers simply have no materials.
    #[must_use]
    pub fn lookup(&self, task: u64) -> &[MediaReference] {
        TaskId::new(task).map(|id| self.get(id)).unwrap_or_default()
    }

    /// `(task, count)` for every task with at least one reference, ascending
    #[must_use]
    pub fn non_empty(&self) -> Vec<(TaskId, usize)> {
        self.entries
            .iter()
            .filter(|(_, refs)| !refs.is_empty())
            .map(|(task, refs)| (*task, refs.len()))
            .collect()
    }

    /// True if no task has any reference
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Total number of references across all tasks
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Decode a catalog document
    ///
    /// # Errors
    /// Returns error only if `text` is not a JSON object at all. Individual
    /// bad keys or items are skipped and listed in the second element.
    pub fn decode(text: &str) -> Result<(Self, Vec<SkippedEntry>), serde_json::Error> {
        let raw: serde_json::Map<String, Value> = serde_json::from_str(text)?;
        let mut catalog = Self::new();
        let mut skipped = Vec::new();

        for (key, value) in raw {
            let task = match key.parse::<TaskId>() {
                Ok(task) if task.to_string() == key => task,
                // "05" would alias "5" and be read ahead of it
                Ok(task) => {
                    skipped.push(SkippedEntry::new(
                        &key,
                        None,
                        format!("non-canonical key for task {task}"),
                    ));
                    continue;
                }
                Err(err) => {
                    skipped.push(SkippedEntry::new(&key, None, err.to_string()));
                    continue;
                }
            };

            let Value::Array(items) = value else {
                skipped.push(SkippedEntry::new(&key, None, "value is not an array"));
                continue;
            };

            // keep the key even if every item is bad; empty sequences read as absent
            let slot = catalog.entries.entry(task).or_default();
            for (index, item) in items.into_iter().enumerate() {
                match decode_item(item) {
                    Ok(reference) => slot.push(reference),
                    Err(reason) => skipped.push(SkippedEntry::new(&key, Some(index), reason)),
                }
            }
        }

        Ok((catalog, skipped))
    }
}

fn decode_item(item: Value) -> Result<MediaReference, String> {
    let (kind, external_id): (String, String) =
        serde_json::from_value(item).map_err(|e| format!("expected [kind, id] pair: {e}"))?;
    let kind = kind.parse::<MediaKind>().map_err(|e| e.to_string())?;
    Ok(MediaReference::new(kind, external_id))
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (task, refs) in &self.entries {
            let pairs: Vec<(&str, &str)> = refs
                .iter()
                .map(|r| (r.kind().as_str(), r.external_id()))
                .collect();
            map.serialize_entry(&task.to_string(), &pairs)?;
        }
        map.end()
    }
}

/// Catalog entry dropped while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Raw task key
    pub key: String,
    /// Position within the key's array, `None` when the whole key was dropped
    pub index: Option<usize>,
    /// Why it was dropped
    pub reason: String,
}

impl SkippedEntry {
    fn new(key: &str, index: Option<usize>, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            index,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "task {:?} item {}: {}", self.key, i, self.reason),
            None => write!(f, "task {:?}: {}", self.key, self.reason),
        }
    }
}
