use std::path::{Path, PathBuf};

use crate::error::ContentStoreError;

/// Tar's `ustar` magic sits at byte offset 257 (spec.md §4.2 "detect
/// with magic-byte inspection and extract if tar"). POSIX and GNU tar
/// both write `ustar` there (GNU pads with two spaces before the NUL).
pub fn looks_like_tar(bytes: &[u8]) -> bool {
    bytes.len() > 262 && &bytes[257..262] == b"ustar"
}

/// Extracts a directory archive fetched from the gateway or daemon,
/// stripping `PaxHeaders` entries and the leading CID path component
/// (spec.md §4.2 "Extract directory archives, stripping PaxHeaders and
/// the CID prefix path component").
pub fn extract_directory(tar_bytes: &[u8], cid: &str, dest_dir: &Path) -> Result<(), ContentStoreError> {
    std::fs::create_dir_all(dest_dir)
        .map_err(|source| ContentStoreError::Io { path: dest_dir.to_path_buf(), source })?;

    let mut archive = tar::Archive::new(tar_bytes);
    let entries = archive
        .entries()
        .map_err(|source| ContentStoreError::TarExtract { cid: cid.to_string(), source })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| ContentStoreError::TarExtract { cid: cid.to_string(), source })?;
        let path = entry
            .path()
            .map_err(|source| ContentStoreError::TarExtract { cid: cid.to_string(), source })?
            .into_owned();

        if is_pax_header(&path) {
            continue;
        }

        let relative = strip_cid_prefix(&path, cid);
        if relative.as_os_str().is_empty() {
            continue;
        }

        let dest_path = dest_dir.join(&relative);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&dest_path)
                .map_err(|source| ContentStoreError::Io { path: dest_path, source })?;
        } else {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|source| ContentStoreError::Io { path: parent.to_path_buf(), source })?;
            }
            entry
                .unpack(&dest_path)
                .map_err(|source| ContentStoreError::TarExtract { cid: cid.to_string(), source })?;
        }
    }
    Ok(())
}

fn is_pax_header(path: &Path) -> bool {
    path.components()
        .next()
        .map(|c| {
            let name = c.as_os_str().to_string_lossy();
            name == "PaxHeaders" || name.starts_with("PaxHeaders.")
        })
        .unwrap_or(false)
}

fn strip_cid_prefix(path: &Path, cid: &str) -> PathBuf {
    match path.strip_prefix(cid) {
        Ok(rest) => rest.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}
