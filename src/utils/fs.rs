//! Filesystem checks and path normalization.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Check whether a directory accepts new files.
///
/// Probes by creating and removing a marker file; permission bits alone are
/// not reliable across platforms and mount options.
pub fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".liftoff-probe-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(file) => {
            drop(file);
            std::fs::remove_file(&probe).is_ok()
        }
        Err(_) => false,
    }
}

/// Check whether a file can be opened for reading.
pub fn file_readable(path: &Path) -> bool {
    File::open(path).is_ok()
}

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`), falling back
/// to joining with the current directory for paths that do not exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_writable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dir_writable(dir.path()));
        assert!(!dir_writable(&dir.path().join("missing")));
    }

    #[test]
    fn test_file_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.tsx");
        assert!(!file_readable(&path));

        std::fs::write(&path, "export default {}").unwrap();
        assert!(file_readable(&path));
    }

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/file.txt"));
        assert!(normalized.is_absolute());
    }
}
