use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::models::CopyReport;

/// Create the parent directories of `path`, tolerating ones that already
/// exist (including ones created concurrently by someone else).
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        match fs::create_dir_all(parent) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(e).context(format!("Failed to create directory: {}", parent.display()))
            }
        }
    }
    Ok(())
}

/// Write `data` verbatim to `path`, creating intermediate directories.
pub fn write_data_to_file(data: impl AsRef<[u8]>, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, data).context(format!("Failed to write file: {}", path.display()))
}

/// Whether `path` exists and is a regular file (symlinks are followed).
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Whether `path` should be treated as a glob pattern rather than a
/// literal path.
pub fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Expand a glob pattern to the regular files it matches, in the order the
/// `glob` crate yields them (alphabetical).
///
/// An invalid pattern or an unreadable entry is logged and skipped.
pub fn expand_paths(pattern: &str) -> Vec<PathBuf> {
    let entries = match glob::glob(pattern) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Invalid glob pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Skipping unreadable glob entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect()
}

/// Copy a single regular file to `dest`, creating intermediate directories.
pub fn copy_regular_file(source: &Path, dest: &Path) -> Result<u64> {
    ensure_parent_dir(dest)?;
    fs::copy(source, dest)
        .context(format!("Failed to copy {} to {}", source.display(), dest.display()))
}

/// Recursively copy the tree rooted at `source` into `dest`.
///
/// Directories are recreated, regular files copied and symlinks or special
/// files skipped. Per-entry failures are recorded in the returned report
/// instead of aborting the walk.
pub fn copy_tree(source: &Path, dest: &Path) -> CopyReport {
    let mut report = CopyReport::default();

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry under {}: {}", source.display(), e);
                if let Some(path) = e.path() {
                    report.failed.push(path.to_path_buf());
                }
                continue;
            }
        };

        let rel_path = match entry.path().strip_prefix(source) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(rel_path);

        if entry.file_type().is_dir() {
            if let Err(e) = fs::create_dir_all(&target) {
                warn!("Failed to create directory {}: {}", target.display(), e);
            }
        } else if entry.file_type().is_file() {
            match copy_regular_file(entry.path(), &target) {
                Ok(_) => report.copied.push(entry.path().to_path_buf()),
                Err(e) => {
                    warn!("{:#}", e);
                    report.failed.push(entry.path().to_path_buf());
                }
            }
        } else {
            debug!("Skipping non-regular file: {}", entry.path().display());
            report.skipped.push(entry.path().to_path_buf());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_intermediate_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.txt");

        write_data_to_file("hello\n", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");

        // Second write to the same tree must not trip over existing dirs
        write_data_to_file("again", &dir.path().join("a/b/d.txt")).unwrap();
    }

    #[test]
    fn test_is_regular_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();

        assert!(is_regular_file(&file));
        assert!(!is_regular_file(dir.path()));
        assert!(!is_regular_file(&dir.path().join("missing")));
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("/var/log/*.log"));
        assert!(is_glob("/etc/host?"));
        assert!(is_glob("/etc/[ab]*"));
        assert!(!is_glob("/etc/hosts"));
    }

    #[test]
    fn test_expand_paths_only_returns_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.log"), "1").unwrap();
        fs::write(dir.path().join("two.log"), "2").unwrap();
        fs::create_dir(dir.path().join("three.log")).unwrap();
        fs::write(dir.path().join("other.txt"), "x").unwrap();

        let pattern = format!("{}/*.log", dir.path().display());
        let matches = expand_paths(&pattern);

        assert_eq!(
            matches,
            vec![dir.path().join("one.log"), dir.path().join("two.log")]
        );
    }

    #[test]
    fn test_expand_paths_no_match_and_bad_pattern() {
        let dir = TempDir::new().unwrap();
        assert!(expand_paths(&format!("{}/*.nothing", dir.path().display())).is_empty());
        assert!(expand_paths("/tmp/[").is_empty());
    }

    #[test]
    fn test_copy_tree_preserves_structure() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("dir1/subdir1")).unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();
        fs::write(src.path().join("file1.txt"), "1").unwrap();
        fs::write(src.path().join("dir1/subdir1/file4.txt"), "4").unwrap();

        let target = dst.path().join("copy");
        let report = copy_tree(src.path(), &target);

        assert_eq!(report.copied.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(fs::read_to_string(target.join("file1.txt")).unwrap(), "1");
        assert_eq!(
            fs::read_to_string(target.join("dir1/subdir1/file4.txt")).unwrap(),
            "4"
        );
        assert!(target.join("empty").is_dir());
    }
}
