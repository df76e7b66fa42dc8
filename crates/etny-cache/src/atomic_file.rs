use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use crate::error::CacheError;

/// Total-file rewrite with fsync-then-rename, so a crash mid-write never
/// leaves a cache file half-written.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|source| CacheError::CreateDir { path: dir.to_path_buf(), source })?;

    let tmp_path = tmp_path_for(path);
    {
        let mut tmp = File::create(&tmp_path)
            .map_err(|source| CacheError::Write { path: tmp_path.clone(), source })?;
        tmp.write_all(bytes)
            .map_err(|source| CacheError::Write { path: tmp_path.clone(), source })?;
        tmp.sync_all().map_err(|source| CacheError::Write { path: tmp_path.clone(), source })?;
    }
    fs::rename(&tmp_path, path)
        .map_err(|source| CacheError::Rename { path: path.to_path_buf(), source })?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("cache");
    path.with_file_name(format!(".{file_name}.tmp"))
}

/// Reads a file's contents, returning `None` if it is missing or unreadable.
/// A present-but-corrupt file is the caller's problem to detect via
/// deserialization; this only covers "the file does not exist yet".
pub fn read_if_exists(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!(target: "cache", path = %path.display(), error = %err, "failed to read cache file, treating as empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("cache.txt");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(read_if_exists(&path).unwrap(), b"hello");
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");
        assert!(read_if_exists(&path).is_none());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        write_atomic(&path, b"a").unwrap();
        write_atomic(&path, b"b").unwrap();
        let mut entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        entries.sort();
        assert_eq!(entries, vec![std::ffi::OsString::from("cache.txt")]);
    }
}
