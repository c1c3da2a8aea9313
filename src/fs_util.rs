use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::error::MigrateError;

pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, MigrateError> {
    Utf8PathBuf::from_path_buf(path).map_err(MigrateError::NonUtf8Path)
}

/// Rewrites `\` separators to `/` and drops leading/trailing separators.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits a file name at its first dot, so `a.b.tar.gz` yields
/// `("a", Some("b.tar.gz"))`.
pub fn split_file_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn list_subdirs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MigrateError> {
    let mut dirs = Vec::new();
    let entries = fs::read_dir(root.as_std_path())
        .map_err(|err| MigrateError::Filesystem(format!("read dir {root}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| MigrateError::Filesystem(err.to_string()))?;
        let file_type = entry
            .file_type()
            .map_err(|err| MigrateError::Filesystem(err.to_string()))?;
        if file_type.is_dir() {
            dirs.push(to_utf8(entry.path())?);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every file below `root`, in a stable lexicographic walk order.
pub fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MigrateError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root.as_std_path()).sort_by_file_name() {
        let entry = entry.map_err(|err| MigrateError::Filesystem(err.to_string()))?;
        if entry.file_type().is_file() {
            files.push(to_utf8(entry.into_path())?);
        }
    }
    Ok(files)
}

/// Sidecar metadata path that travels with an asset file or folder.
pub fn meta_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.meta"))
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), MigrateError> {
    let parent = path
        .parent()
        .ok_or_else(|| MigrateError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| MigrateError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".asset-migrate")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| MigrateError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| MigrateError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| MigrateError::Filesystem(err.to_string()))?;
    Ok(())
}
