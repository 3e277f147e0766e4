//! Persisted Event Buffer
//!
//! A JSON array of event envelopes under one fixed storage key, capped at
//! `capacity` entries with the oldest evicted first.
//!
//! Read-modify-write is not atomic: two recorders sharing a store can
//! drop each other's writes. Last writer wins.

use serde_json::Value;

use super::error::AnalyticsResult;
use super::event::AnalyticsEvent;
use super::storage::KeyValueStore;

pub struct PersistedBuffer {
    key: String,
    capacity: usize,
}

impl PersistedBuffer {
    pub fn new(key: &str, capacity: usize) -> Self {
        Self {
            key: key.to_string(),
            capacity: capacity.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Raw stored entries, oldest first. Missing or non-array data reads as empty.
    fn read_entries(&self, store: &dyn KeyValueStore) -> Vec<Value> {
        let raw = match store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read stored analytics events: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Stored analytics events under '{}' are corrupt, treating as empty: {}", self.key, e);
                Vec::new()
            }
        }
    }

    /// Stored events, oldest first. Entries that are not event envelopes
    /// are skipped here but stay in the store.
    pub fn read(&self, store: &dyn KeyValueStore) -> Vec<AnalyticsEvent> {
        self.read_entries(store)
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("Skipping unreadable stored analytics event #{}: {}", index, e);
                    None
                }
            })
            .collect()
    }

    /// Append `event`, evict from the front down to capacity, write back.
    /// Unreadable entries are kept and count toward the capacity.
    pub fn append(&self, store: &dyn KeyValueStore, event: &AnalyticsEvent) -> AnalyticsResult<usize> {
        let mut entries = self.read_entries(store);
        entries.push(serde_json::to_value(event)?);

        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(0..overflow);
        }

        let json = serde_json::to_string(&entries)?;
        store.set(&self.key, &json)?;
        Ok(entries.len())
    }

    /// Delete the key entirely
    pub fn remove(&self, store: &dyn KeyValueStore) -> AnalyticsResult<()> {
        store.remove(&self.key)
    }
}
