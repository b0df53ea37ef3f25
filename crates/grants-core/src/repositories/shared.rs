//! Shared repository utilities.
//!
//! Records live in sharded directories under a per-kind base directory:
//!
//! ```text
//! <base>/
//!   <s1>/
//!     <s2>/
//!       <id>/
//!         <record file>
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the id. Every write lands in a
//! temporary sibling first and is renamed into place, so readers never see a partial record.

use crate::error::{GrantsError, GrantsResult, RecordKind};
use grants_uuid::RecordId;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Path of the record file for `id`.
pub(crate) fn record_path(base_dir: &Path, id: &RecordId, filename: &str) -> PathBuf {
    id.sharded_dir(base_dir).join(filename)
}

/// Temporary sibling used while writing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", RecordId::new()))
}

/// Writes `contents` to `path` via a temp file and rename, creating parent directories.
///
/// # Errors
///
/// Returns [`GrantsError::StorageDirCreation`] if the parent directory cannot be created and
/// [`GrantsError::FileWrite`] if writing or renaming fails.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> GrantsResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(GrantsError::StorageDirCreation)?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, contents).map_err(GrantsError::FileWrite)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(GrantsError::FileWrite(e));
    }
    Ok(())
}

/// Creates `path` holding `contents`, failing if it already exists.
///
/// Returns `Ok(false)` when another writer got there first. The file is linked into place
/// fully written, so a winner's contents are always readable.
pub(crate) fn create_exclusive(path: &Path, contents: &[u8]) -> GrantsResult<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(GrantsError::StorageDirCreation)?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, contents).map_err(GrantsError::FileWrite)?;
    let linked = fs::hard_link(&tmp, path);
    let _ = fs::remove_file(&tmp);

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(GrantsError::FileWrite(e)),
    }
}

/// Reads a record file, mapping a missing file to [`GrantsError::NotFound`].
pub(crate) fn read_record(path: &Path, kind: RecordKind, id: &RecordId) -> GrantsResult<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(GrantsError::not_found(kind, id)),
        Err(e) => Err(GrantsError::FileRead(e)),
    }
}

/// Every `<base>/<s1>/<s2>/<id>/<filename>` that exists, in id order.
///
/// A missing base directory means no records. Entries whose name is not a canonical id are
/// skipped.
pub(crate) fn list_record_files(base_dir: &Path, filename: &str) -> GrantsResult<Vec<PathBuf>> {
    fn subdirs(dir: &Path) -> GrantsResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GrantsError::FileRead(e)),
        };
        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(GrantsError::FileRead)?;
            if entry.file_type().map_err(GrantsError::FileRead)?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    let mut files = Vec::new();
    for s1 in subdirs(base_dir)? {
        for s2 in subdirs(&s1)? {
            for record_dir in subdirs(&s2)? {
                let is_record = record_dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(RecordId::is_canonical);
                let file = record_dir.join(filename);
                if is_record && file.is_file() {
                    files.push(file);
                }
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let id = RecordId::new();
        let path = record_path(temp.path(), &id, "instance.json");

        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        let siblings = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1);
    }

    #[test]
    fn exclusive_create_has_one_winner() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("links").join("parent");

        assert!(create_exclusive(&path, b"first").unwrap());
        assert!(!create_exclusive(&path, b"second").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn missing_record_is_not_found() {
        let temp = TempDir::new().unwrap();
        let id = RecordId::new();
        let err = read_record(
            &record_path(temp.path(), &id, "x.json"),
            RecordKind::Instance,
            &id,
        )
        .unwrap_err();
        assert!(matches!(err, GrantsError::NotFound { .. }));
    }

    #[test]
    fn listing_walks_shards_and_ignores_strays() {
        let temp = TempDir::new().unwrap();
        assert!(list_record_files(&temp.path().join("none"), "r").unwrap().is_empty());

        for _ in 0..3 {
            write_atomic(&record_path(temp.path(), &RecordId::new(), "r"), b"{}").unwrap();
        }
        fs::create_dir_all(temp.path().join("ab").join("cd").join("not-an-id")).unwrap();

        assert_eq!(list_record_files(temp.path(), "r").unwrap().len(), 3);
    }
}
