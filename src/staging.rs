//! Staging directory file operations.
//!
//! Client assets (manifest, stand-in background page) are written into a
//! staging directory at config time and copied into the build output at
//! build end. Writes go through a temporary file in the destination
//! directory and are renamed into place, so a reader never observes a
//! partially written file.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Error, Result};

// ============================================================================
// Public Functions
// ============================================================================

/// Writes `contents` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Staging`] if the directory, temporary file, or rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    fs::create_dir_all(dir).map_err(|e| Error::staging(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::staging(dir, e))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| Error::staging(path, e))?;
    file.persist(path)
        .map_err(|e| Error::staging(path, e.error))?;

    trace!(path = %path.display(), bytes = contents.len(), "Staged file");
    Ok(())
}

/// Removes a staged file if it exists.
///
/// # Errors
///
/// Returns [`Error::Staging`] for any failure other than the file being absent.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale staged file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::staging(path, e)),
    }
}

/// Recursively copies `src` into `dest`, overwriting existing files.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns [`Error::Staging`] if walking, creating, or copying fails.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| Error::staging(dest, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| Error::staging(src, e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::staging(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::staging(&target, e))?;
            copied += 1;
        }
    }

    debug!(
        src = %src.display(),
        dest = %dest.display(),
        copied,
        "Copied staged assets"
    );

    Ok(copied)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a/b/manifest.json");

        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("manifest.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temporary files left behind
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_if_exists() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("background.html");

        assert!(remove_if_exists(&path).is_ok());

        fs::write(&path, "<html></html>").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        fs::write(src.path().join("manifest.json"), "{}").unwrap();
        fs::create_dir_all(src.path().join("icons")).unwrap();
        fs::write(src.path().join("icons/icon16.png"), [0u8; 4]).unwrap();

        let out = dest.path().join("dist");
        let copied = copy_dir(src.path(), &out).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(out.join("manifest.json")).unwrap(), "{}");
        assert!(out.join("icons/icon16.png").is_file());
    }

    #[test]
    fn test_copy_dir_missing_source_fails() {
        let dest = tempfile::tempdir().unwrap();
        let err = copy_dir(Path::new("/nonexistent/crx-staging"), dest.path()).unwrap_err();
        assert!(matches!(err, Error::Staging { .. }));
    }
}
