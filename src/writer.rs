//! Write-if-changed file output
//!
//! Both the tangler and the weaver write through this wrapper. Content is
//! computed fully in memory first; if the file on disk already holds the
//! identical bytes it is left alone, preserving its modification time for
//! downstream build tools. Otherwise the content goes to a sibling temporary
//! path and is renamed into place, so a failed run never leaves a partial
//! file behind.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// What a write call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Disk already held identical bytes; nothing was touched
    Unchanged,
    Written,
}

/// Reject output paths that would escape the output directory: absolute
/// paths and `..` components.
pub fn path_is_safe(path: &str) -> bool {
    let p = Path::new(path);
    !p.is_absolute() && !p.components().any(|c| matches!(c, Component::ParentDir))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    path.with_file_name(format!(".{}.weft-tmp", file_name))
}

/// Write `content` to `path` unless the file already contains exactly these
/// bytes. Parent directories are created as needed.
pub fn write_if_changed(path: &Path, content: &str) -> io::Result<WriteOutcome> {
    if let Ok(existing) = fs::read(path) {
        if existing == content.as_bytes() {
            debug!(path = %path.display(), "content unchanged, not rewriting");
            return Ok(WriteOutcome::Unchanged);
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp = temp_path_for(path);
    fs::write(&temp, content)?;
    match fs::rename(&temp, path) {
        Ok(()) => Ok(WriteOutcome::Written),
        Err(err) => {
            let _ = fs::remove_file(&temp);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        assert_eq!(write_if_changed(&path, "hello").unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn identical_content_preserves_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_if_changed(&path, "same").unwrap();
        let first_mtime = fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(
            write_if_changed(&path, "same").unwrap(),
            WriteOutcome::Unchanged
        );
        let second_mtime = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(first_mtime, second_mtime);
    }

    #[test]
    fn changed_content_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_if_changed(&path, "one").unwrap();
        assert_eq!(
            write_if_changed(&path, "two").unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn empty_content_makes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".nojekyll");
        write_if_changed(&path, "").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src/deep/out.txt");
        write_if_changed(&path, "nested").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "nested");
    }

    #[test]
    fn no_temp_file_remains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_if_changed(&path, "x").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["out.txt"]);
    }

    #[test]
    fn unsafe_paths_are_detected() {
        assert!(path_is_safe("src/main.rs"));
        assert!(!path_is_safe("/etc/passwd"));
        assert!(!path_is_safe("../escape.txt"));
        assert!(!path_is_safe("ok/../../escape.txt"));
    }
}
