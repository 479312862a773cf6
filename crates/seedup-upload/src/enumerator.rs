//! Local file enumeration
//!
//! Walks a directory tree with `walkdir`, following symlinks so linked
//! content is uploaded, while `walkdir`'s loop detection stops symlink
//! cycles. Directories and zero-byte placeholder files are not yielded.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use seedup_core::domain::PipelineError;

/// A regular file found under the enumeration root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute path
    pub path: PathBuf,
    pub size: u64,
    /// Directory of the file relative to the root (empty at top level)
    pub relative_dir: PathBuf,
}

/// Lazily lists the files under a root path
#[derive(Debug, Clone)]
pub struct LocalFileEnumerator {
    root: PathBuf,
}

impl LocalFileEnumerator {
    /// Resolves `root` to an absolute, canonical path
    ///
    /// # Errors
    /// `PipelineError::Io` when the root does not exist or cannot be read.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|e| PipelineError::io(root, e))?;
        if root.is_dir() {
            std::fs::read_dir(&root).map_err(|e| PipelineError::io(&root, e))?;
        } else {
            std::fs::metadata(&root).map_err(|e| PipelineError::io(&root, e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true when the root is a single file rather than a directory
    pub fn is_single_file(&self) -> bool {
        self.root.is_file()
    }

    /// Iterates over the files under the root in file-name order
    ///
    /// The sequence is finite and can be restarted by calling this again.
    pub fn enumerate(&self) -> impl Iterator<Item = LocalFile> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    if err.loop_ancestor().is_some() {
                        debug!(error = %err, "Skipping symlink cycle");
                    } else {
                        warn!(error = %err, "Skipping unreadable entry");
                    }
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                let size = match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(err) => {
                        warn!(path = %entry.path().display(), error = %err, "Cannot stat file");
                        return None;
                    }
                };
                if size == 0 {
                    debug!(path = %entry.path().display(), "Skipping empty file");
                    return None;
                }

                let relative_dir = entry
                    .path()
                    .parent()
                    .and_then(|parent| parent.strip_prefix(&self.root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default();

                Some(LocalFile {
                    path: entry.into_path(),
                    size,
                    relative_dir,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn names(files: &[LocalFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let err = LocalFileEnumerator::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_walks_tree_and_skips_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"aaaa").unwrap();
        fs::write(dir.path().join("empty.part"), b"").unwrap();
        fs::create_dir_all(dir.path().join("season 1/extras")).unwrap();
        fs::write(dir.path().join("season 1/e01.mkv"), b"123").unwrap();
        fs::write(dir.path().join("season 1/extras/x.srt"), b"1").unwrap();

        let enumerator = LocalFileEnumerator::new(dir.path()).unwrap();
        let files: Vec<_> = enumerator.enumerate().collect();

        assert_eq!(names(&files), vec!["a.mp4", "e01.mkv", "x.srt"]);
        assert_eq!(files[0].relative_dir, PathBuf::new());
        assert_eq!(files[1].relative_dir, PathBuf::from("season 1"));
        assert_eq!(files[2].relative_dir, PathBuf::from("season 1/extras"));
        assert_eq!(files[1].size, 3);
        assert!(files.iter().all(|f| f.path.is_absolute()));

        // restartable
        assert_eq!(enumerator.enumerate().count(), 3);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        fs::write(&file, b"data").unwrap();

        let enumerator = LocalFileEnumerator::new(&file).unwrap();
        assert!(enumerator.is_single_file());
        let files: Vec<_> = enumerator.enumerate().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_dir, PathBuf::new());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/f.bin"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let files: Vec<_> = LocalFileEnumerator::new(dir.path())
            .unwrap()
            .enumerate()
            .collect();
        assert_eq!(names(&files), vec!["f.bin"]);
    }
}
