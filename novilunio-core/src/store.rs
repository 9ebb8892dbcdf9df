//! Whole-file JSON persistence shared by the ledger, settings and watch state.
//!
//! Every store is one pretty-printed JSON object rewritten in full on each
//! mutation. Writes go to a sibling temp file that is renamed over the target,
//! so a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Errors raised by on-disk stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Data directory not found")]
    NoDataDir,
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read and parse a JSON store.
///
/// Returns `Ok(None)` when the file does not exist and
/// [`StoreError::Corrupt`] when it exists but does not parse.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    // An empty file is what a fresh bootstrap leaves behind.
    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Load a store, falling back to `T::default()` when it is missing or corrupt.
///
/// A corrupt file is renamed to `<file>.corrupt` before the fallback so the
/// next write does not destroy it. IO errors other than "not found" are
/// still returned.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match read_json(path) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            debug!(path = %path.display(), "store missing, starting empty");
            Ok(T::default())
        }
        Err(StoreError::Corrupt { path, source }) => {
            let aside = corrupt_path(&path);
            warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                error = %source,
                "store is malformed, starting empty"
            );
            if let Err(e) = fs::rename(&path, &aside) {
                warn!(path = %path.display(), error = %e, "failed to move corrupt store aside");
            }
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let tmp_path = tmp_path(path);
    fs::write(&tmp_path, content).map_err(|e| StoreError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: BTreeMap<String, u32> = load_or_default(&dir.path().join("none.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "").unwrap();
        let loaded: BTreeMap<String, u32> = load_or_default(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded: BTreeMap<String, u32> = load_or_default(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(!path.exists());
        assert!(dir.path().join("store.json.corrupt").exists());
    }

    #[test]
    fn test_read_json_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();
        let result = read_json::<Vec<u32>>(&path);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1u32);
        write_json_atomic(&path, &map).unwrap();
        map.insert("b".to_string(), 2u32);
        write_json_atomic(&path, &map).unwrap();

        let loaded: BTreeMap<String, u32> = read_json(&path).unwrap().unwrap();
        assert_eq!(loaded, map);
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'), "store should be pretty-printed");
    }
}
