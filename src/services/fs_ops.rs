//! Filesystem primitives shared by the unpacker and the mod manager.
//!
//! All of them replace rather than merge: an existing destination entry is
//! removed before the new one is put in place.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use std::fs;
use walkdir::WalkDir;

/// How [`relocate`] got an entry to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Renamed in place; the source is gone
    Moved,
    /// Rename failed, so the entry was copied; the source is left in place
    Copied,
}

/// Create `dir` and its parents; an existing directory is reused.
pub fn ensure_dir(dir: &Utf8Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir))
}

/// Delete `path`: directories recursively, anything else is unlinked.
///
/// A path that does not exist is left alone.
pub fn remove_entry(path: &Utf8Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove directory: {}", path))
    } else {
        fs::remove_file(path).with_context(|| format!("Failed to remove file: {}", path))
    }
}

/// Copy a single file, creating parent directories and keeping its modification time.
pub fn copy_file(src: &Utf8Path, dest: &Utf8Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    let bytes = fs::copy(src, dest).with_context(|| format!("Failed to copy {} -> {}", src, dest))?;
    preserve_mtime(src, dest)?;
    Ok(bytes)
}

/// Deep-copy the directory `src` to `dest`, which must not exist yet.
pub fn copy_dir_all(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", src))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("Walked outside of {}", src))?;
        let relative = Utf8Path::from_path(relative)
            .with_context(|| format!("Non UTF-8 path under {}", src))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            let source = Utf8Path::from_path(entry.path())
                .with_context(|| format!("Non UTF-8 path under {}", src))?;
            copy_file(source, &target)?;
        }
    }

    Ok(())
}

/// Copy `src` (file or directory) to `dest`, replacing whatever is there.
pub fn replace_with_copy(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    if src.is_dir() {
        remove_entry(dest)?;
        copy_dir_all(src, dest)
    } else {
        // fs::copy overwrites files, but not a directory in the way
        if dest.is_dir() {
            remove_entry(dest)?;
        }
        copy_file(src, dest).map(|_| ())
    }
}

/// Put `src` at `dest`, replacing any existing entry.
///
/// Prefers a rename; when that fails (for example across devices) the entry
/// is copied instead and the source stays where it was.
pub fn relocate(src: &Utf8Path, dest: &Utf8Path) -> Result<Relocation> {
    remove_entry(dest)?;

    match fs::rename(src, dest) {
        Ok(()) => Ok(Relocation::Moved),
        Err(e) => {
            tracing::debug!("rename {} -> {} failed ({}), copying instead", src, dest, e);
            if src.is_dir() {
                copy_dir_all(src, dest)?;
            } else {
                copy_file(src, dest)?;
            }
            Ok(Relocation::Copied)
        }
    }
}

fn preserve_mtime(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    let metadata = fs::metadata(src).with_context(|| format!("Failed to stat {}", src))?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))
        .with_context(|| format!("Failed to set modification time on {}", dest))
}

/// Entries directly under `dir`, sorted by file name.
pub fn sorted_entries(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut entries = dir
        .read_dir_utf8()
        .with_context(|| format!("Failed to read directory: {}", dir))?
        .map(|entry| entry.map(|e| e.into_path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read directory: {}", dir))?;
    entries.sort();
    Ok(entries)
}
