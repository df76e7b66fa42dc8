use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{atomic_file, error::CacheError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_secs();
        Timestamp(secs)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    timestamp: u64,
}

/// Mapping from value to `{timestamp}`, used for age-based GC (the
/// content store's weekly sweep). `add` stamps `now`, or refreshes the
/// timestamp if the value is already present. Eviction at capacity is
/// FIFO by insertion order, not by timestamp.
#[derive(Debug)]
pub struct TimestampedSetCache {
    path: PathBuf,
    limit: usize,
    entries: IndexMap<String, Entry>,
}

impl TimestampedSetCache {
    /// Loads the cache, migrating a legacy plain-list on-disk format
    /// (`["cid1", "cid2"]`) to the timestamped shape in place. The
    /// migrated file is rewritten before this returns, so the legacy
    /// format is never seen again on a subsequent load.
    pub fn load(path: impl AsRef<Path>, limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut migrated = false;

        let entries = atomic_file::read_if_exists(&path)
            .and_then(|bytes| {
                if let Ok(map) = serde_json::from_slice::<IndexMap<String, Entry>>(&bytes) {
                    return Some(map);
                }
                if let Ok(list) = serde_json::from_slice::<Vec<String>>(&bytes) {
                    tracing::info!(target: "cache", path = %path.display(), count = list.len(), "migrating legacy list cache to timestamped set");
                    migrated = true;
                    let now = Timestamp::now().0;
                    return Some(list.into_iter().map(|v| (v, Entry { timestamp: now })).collect());
                }
                tracing::warn!(target: "cache", path = %path.display(), "corrupt timestamped cache, starting empty");
                None
            })
            .unwrap_or_default();

        let cache = Self { path, limit, entries };
        if migrated {
            if let Err(err) = cache.persist() {
                tracing::error!(target: "cache", error = %err, "failed to persist migrated cache");
            }
        }
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains_key(value)
    }

    pub fn get_timestamp(&self, value: &str) -> Option<Timestamp> {
        self.entries.get(value).map(|e| Timestamp(e.timestamp))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Timestamp)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), Timestamp(e.timestamp)))
    }

    /// Stamps `value` with the current time, refreshing it if already
    /// present (refreshing does not change its FIFO eviction position).
    pub fn add(&mut self, value: impl Into<String>) -> Result<(), CacheError> {
        let value = value.into();
        let now = Timestamp::now().0;
        match self.entries.get_mut(&value) {
            Some(entry) => entry.timestamp = now,
            None => {
                self.entries.insert(value, Entry { timestamp: now });
                while self.entries.len() > self.limit {
                    self.entries.shift_remove_index(0);
                }
            }
        }
        self.persist()
    }

    pub fn remove(&mut self, value: &str) -> Result<Option<Timestamp>, CacheError> {
        let removed = self.entries.shift_remove(value).map(|e| Timestamp(e.timestamp));
        self.persist()?;
        Ok(removed)
    }

    /// Drops every entry, persisting the now-empty cache (content-store
    /// version-change protocol: a daemon wipe invalidates the whole
    /// local ledger, not just individual CIDs).
    pub fn wipe(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.persist()
    }

    /// Entries whose timestamp is older than `now - max_age_secs`.
    pub fn older_than(&self, max_age_secs: u64) -> Vec<&str> {
        let now = Timestamp::now().0;
        self.entries
            .iter()
            .filter(|(_, e)| now.saturating_sub(e.timestamp) > max_age_secs)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    fn persist(&self) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        atomic_file::write_atomic(&self.path, &bytes)
    }
}
