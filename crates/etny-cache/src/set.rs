use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::{atomic_file, error::CacheError};

/// Unordered set of identifiers ("terminally processed" ids). `add` is
/// idempotent; persists as a JSON array rewritten atomically on every
/// mutation.
#[derive(Debug)]
pub struct SetCache {
    path: PathBuf,
    limit: usize,
    entries: HashSet<String>,
}

impl SetCache {
    pub fn load(path: impl AsRef<Path>, limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = atomic_file::read_if_exists(&path)
            .and_then(|bytes| match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(list) => Some(list.into_iter().collect()),
                Err(err) => {
                    tracing::warn!(target: "cache", path = %path.display(), error = %err, "corrupt set cache, starting empty");
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

    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    /// Idempotent: adding an already-present value is a no-op write.
    pub fn add(&mut self, value: impl Into<String>) -> Result<(), CacheError> {
        let value = value.into();
        if self.entries.contains(&value) {
            return Ok(());
        }
        self.entries.insert(value);
        while self.entries.len() > self.limit {
            // HashSet has no insertion order; a `SetCache` at the
            // bounded-capacity edge drops an arbitrary member rather
            // than tracking recency, matching "terminally processed"
            // semantics where no entry is ever revisited anyway.
            if let Some(any) = self.entries.iter().next().cloned() {
                self.entries.remove(&any);
            }
        }
        self.persist()
    }

    pub fn wipe(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), CacheError> {
        let list: Vec<&str> = self.entries.iter().map(|s| s.as_str()).collect();
        let bytes = serde_json::to_vec_pretty(&list)?;
        atomic_file::write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dpreq_cache.txt");
        let mut cache = SetCache::load(&path, 10);
        cache.add("do-1").unwrap();
        cache.add("do-1").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reload_preserves_membership() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doreq_cache.txt");
        let mut cache = SetCache::load(&path, 10);
        cache.add("do-42").unwrap();

        let reloaded = SetCache::load(&path, 10);
        assert!(reloaded.contains("do-42"));
    }
}
