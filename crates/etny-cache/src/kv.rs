use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::{atomic_file, error::CacheError};

/// Ordered key→value cache, bounded by `limit`. Insertion order is
/// preserved; once the map exceeds `limit` entries the oldest one is
/// evicted. Persists as a single JSON object, rewritten atomically on
/// every mutation.
#[derive(Debug)]
pub struct KvCache<V> {
    path: PathBuf,
    limit: usize,
    entries: IndexMap<String, V>,
}

impl<V> KvCache<V>
where
    V: Serialize + DeserializeOwned + Clone + PartialEq,
{
    /// Loads the cache from `path`, or starts empty if the file is
    /// missing/corrupt (read failures never propagate, per the cache
    /// layer's failure semantics).
    pub fn load(path: impl AsRef<Path>, limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = atomic_file::read_if_exists(&path)
            .and_then(|bytes| match serde_json::from_slice::<IndexMap<String, V>>(&bytes) {
                Ok(map) => Some(map),
                Err(err) => {
                    tracing::warn!(target: "cache", path = %path.display(), error = %err, "corrupt kv cache, starting empty");
                    None
                }
            })
            .unwrap_or_default();
        Self { path, limit, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// O(n) scan for the first key mapping to `value`.
    pub fn get_key_for_value(&self, value: &V) -> Option<&str> {
        self.entries.iter().find(|(_, v)| *v == value).map(|(k, _)| k.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts or overwrites `key`, evicting the oldest entry if the map
    /// now exceeds `limit`. Persists immediately.
    pub fn add(&mut self, key: impl Into<String>, value: V) -> Result<(), CacheError> {
        let key = key.into();
        self.entries.insert(key, value);
        while self.entries.len() > self.limit {
            self.entries.shift_remove_index(0);
        }
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<V>, CacheError> {
        let removed = self.entries.shift_remove(key);
        self.persist()?;
        Ok(removed)
    }

    pub fn wipe(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        atomic_file::write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders_cache.txt");
        let mut cache: KvCache<u64> = KvCache::load(&path, 10);
        cache.add("dp-1", 42).unwrap();

        let reloaded: KvCache<u64> = KvCache::load(&path, 10);
        assert_eq!(reloaded.get("dp-1"), Some(&42));
    }

    #[test]
    fn eviction_at_capacity_is_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        let mut cache: KvCache<u64> = KvCache::load(&path, 2);
        cache.add("a", 1).unwrap();
        cache.add("b", 2).unwrap();
        cache.add("c", 3).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key("a"));
        assert_eq!(cache.get("b"), Some(&2));
        assert_eq!(cache.get("c"), Some(&3));
    }

    #[test]
    fn get_key_for_value_scans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        let mut cache: KvCache<u64> = KvCache::load(&path, 10);
        cache.add("dp-7", 100).unwrap();
        assert_eq!(cache.get_key_for_value(&100), Some("dp-7"));
        assert_eq!(cache.get_key_for_value(&999), None);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let cache: KvCache<u64> = KvCache::load(&path, 10);
        assert!(cache.is_empty());
    }
}
