use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::{atomic_file, error::CacheError};

/// Append-only historical record (the `merged_orders_cache`): every
/// `{do, dp, order}` tuple ever produced, kept for external audit.
/// Like the other cache flavors it rewrites the whole file on each
/// append rather than truly streaming appends, so the crash-safety
/// story (write-temp, fsync, rename) is identical.
#[derive(Debug)]
pub struct AppendListCache<T> {
    path: PathBuf,
    limit: usize,
    entries: Vec<T>,
}

impl<T> AppendListCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn load(path: impl AsRef<Path>, limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = atomic_file::read_if_exists(&path)
            .and_then(|bytes| match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(list) => Some(list),
                Err(err) => {
                    tracing::warn!(target: "cache", path = %path.display(), error = %err, "corrupt append-list cache, starting empty");
                    None
                }
            })
            .unwrap_or_default();
        Self { path, limit, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn append(&mut self, value: T) -> Result<(), CacheError> {
        self.entries.push(value);
        while self.entries.len() > self.limit {
            self.entries.remove(0);
        }
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
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Tuple {
        do_id: u64,
        dp_id: u64,
        order_id: u64,
    }

    #[test]
    fn append_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_orders_cache.json");
        let mut cache: AppendListCache<Tuple> = AppendListCache::load(&path, 10);
        cache.append(Tuple { do_id: 1, dp_id: 2, order_id: 3 }).unwrap();

        let reloaded: AppendListCache<Tuple> = AppendListCache::load(&path, 10);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.iter().next().unwrap().order_id, 3);
    }
}
