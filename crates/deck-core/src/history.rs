//! The client-persisted submission log.
//!
//! One storage key holds a JSON array of records; reads are permissive
//! across every historical shape, writes are canonical only. The in-memory
//! store is authoritative for the page lifetime — persistence failures are
//! logged and otherwise ignored.

use deck_types::{
    config::ApiConfig,
    history::{HistoryEntry, StoredEntry},
    Result,
};

use crate::ports::StoragePort;

/// The single persisted key.
pub const HISTORY_KEY: &str = "llm_history";

/// Global retention bound. A hard cap on the merged set, not per-template:
/// heavy use of one template evicts another's older entries.
pub const HISTORY_LIMIT: usize = 100;

/// All known entries, merged, timestamp-descending.
#[derive(Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the persisted value. Absent or malformed storage is an
    /// empty store, never an error.
    pub async fn load(storage: &dyn StoragePort, configs: &[ApiConfig]) -> Self {
        match storage.get(HISTORY_KEY).await {
            Ok(Some(raw)) => Self::from_json(&raw, configs),
            Ok(None) => Self::new(),
            Err(e) => {
                log::warn!("history unreadable ({}), starting empty", e);
                Self::new()
            }
        }
    }

    /// Decode a raw JSON array. Elements that are not objects are skipped;
    /// object records always project to the canonical shape.
    pub fn from_json(raw: &str, configs: &[ApiConfig]) -> Self {
        let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("discarding corrupt history: {}", e);
                return Self::new();
            }
        };

        let mut store = Self {
            entries: values
                .into_iter()
                .filter_map(|v| serde_json::from_value::<StoredEntry>(v).ok())
                .map(|r| r.canonicalize(configs))
                .collect(),
        };
        store.sort_and_truncate();
        store
    }

    /// The canonical write shape: a JSON array of current-format records.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A session's view: a filtered copy of the entries for its template.
    pub fn for_template(&self, name: &str) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.template_name == name)
            .cloned()
            .collect()
    }

    /// Distinct template names in store order (most recent first).
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !names.iter().any(|n| n == &entry.template_name) {
                names.push(entry.template_name.clone());
            }
        }
        names
    }

    /// Head insert, then restore the global invariant: timestamp-descending
    /// order, truncated to [`HISTORY_LIMIT`].
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.sort_and_truncate();
    }

    /// Remove one entry by global index. The confirmation step lives in the
    /// UI; the store never refuses.
    pub fn delete(&mut self, index: usize) -> Option<HistoryEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Remove the `index`-th entry of one template's slice.
    pub fn delete_for_template(&mut self, name: &str, index: usize) -> Option<HistoryEntry> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.template_name == name)
            .map(|(i, _)| i)
            .nth(index)?;
        Some(self.entries.remove(pos))
    }

    fn sort_and_truncate(&mut self) {
        // Stable sort: entries sharing a timestamp keep head-insert order.
        self.entries
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.entries.truncate(HISTORY_LIMIT);
    }
}
