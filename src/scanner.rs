//! Lazy discovery of completed downloads.
//!
//! The scan is a thin layer over [`walkdir`]: entries are pulled one at a
//! time, so a consumer can stop early (`.take(n)`, `.find(..)`) without paying
//! for the rest of the tree. Every call to [`Scanner::scan`] starts a fresh,
//! independent traversal.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::extensions::ExtensionSet;

/// Traversal settings for one source tree.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    extensions: ExtensionSet,
    recursive: bool,
    sorted: bool,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, extensions: ExtensionSet) -> Self {
        Self {
            root: root.into(),
            extensions,
            recursive: true,
            sorted: false,
        }
    }

    /// Descend into subdirectories. Applies uniformly at every depth.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Visit the entries of each directory in file-name order instead of the
    /// platform's enumeration order.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a traversal.
    ///
    /// # Errors
    /// [`Error::NotFound`] when the root does not exist or is not a directory.
    /// Problems found while walking (unreadable subdirectories, symlink loops)
    /// are yielded as `Err` items and do not end the traversal.
    pub fn scan(&self) -> Result<Scan> {
        if !self.root.is_dir() {
            return Err(Error::NotFound {
                path: self.root.clone(),
            });
        }

        let mut walker = WalkDir::new(&self.root).min_depth(1).follow_links(true);
        if !self.recursive {
            walker = walker.max_depth(1);
        }
        if self.sorted {
            walker = walker.sort_by_file_name();
        }

        debug!(
            root = %self.root.display(),
            recursive = self.recursive,
            extensions = %self.extensions,
            "Starting scan"
        );

        Ok(Scan {
            root: self.root.clone(),
            extensions: self.extensions.clone(),
            inner: walker.into_iter(),
        })
    }
}

/// Convenience form of [`Scanner`] with unsorted traversal.
pub fn scan(root: impl Into<PathBuf>, extensions: &ExtensionSet, recursive: bool) -> Result<Scan> {
    Scanner::new(root, extensions.clone())
        .recursive(recursive)
        .scan()
}

/// A single pass over a source tree, yielding regular files whose suffix is
/// in the [`ExtensionSet`]. Directories are never yielded.
pub struct Scan {
    root: PathBuf,
    extensions: ExtensionSet,
    inner: walkdir::IntoIter,
}

impl Iterator for Scan {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) if is_dangling_symlink(&err) => continue,
                Err(err) => {
                    let path = err.path().unwrap_or(self.root.as_path()).to_path_buf();
                    return Some(Err(Error::Scan { path, source: err }));
                }
            };

            // `follow_links` makes this the type of the link target, so a
            // symlinked file counts and fifos/sockets fall through.
            if entry.file_type().is_file() && self.extensions.matches(entry.path()) {
                debug!(path = %entry.path().display(), depth = entry.depth(), "Matched file");
                return Some(Ok(entry.into_path()));
            }
        }
    }
}

fn is_dangling_symlink(err: &walkdir::Error) -> bool {
    let not_found = err
        .io_error()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound);

    not_found
        && err
            .path()
            .and_then(|p| std::fs::symlink_metadata(p).ok())
            .is_some_and(|meta| meta.file_type().is_symlink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn missing_root_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let err = scan(temp.path().join("nope"), &ExtensionSet::default(), true)
            .err()
            .expect("missing root must fail");
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn file_root_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("movie.mkv");
        fs::write(&file, b"x").expect("write");
        assert!(matches!(
            scan(&file, &ExtensionSet::default(), true).err(),
            Some(Error::NotFound { .. })
        ));
    }

    #[test]
    fn directories_named_like_videos_are_not_yielded() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir(temp.path().join("Show.S01.mkv")).expect("mkdir");
        fs::write(temp.path().join("Show.S01.mkv").join("ep1.mkv"), b"x").expect("write");

        let found = scan(temp.path(), &ExtensionSet::default(), true)
            .expect("scan")
            .collect::<Result<Vec<_>>>()
            .expect("no errors");
        assert_eq!(names(&found), vec!["ep1.mkv"]);
    }

    #[test]
    fn sorted_scan_is_name_ordered() {
        let temp = TempDir::new().expect("tempdir");
        for name in ["c.mkv", "a.mkv", "b.mp4"] {
            fs::write(temp.path().join(name), b"x").expect("write");
        }

        let found = Scanner::new(temp.path(), ExtensionSet::default())
            .sorted(true)
            .scan()
            .expect("scan")
            .collect::<Result<Vec<_>>>()
            .expect("no errors");
        assert_eq!(names(&found), vec!["a.mkv", "b.mp4", "c.mkv"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped_silently() {
        let temp = TempDir::new().expect("tempdir");
        std::os::unix::fs::symlink(temp.path().join("gone.mkv"), temp.path().join("link.mkv"))
            .expect("symlink");
        fs::write(temp.path().join("real.mkv"), b"x").expect("write");

        let found = scan(temp.path(), &ExtensionSet::default(), false)
            .expect("scan")
            .collect::<Result<Vec<_>>>()
            .expect("no errors");
        assert_eq!(names(&found), vec!["real.mkv"]);
    }
}
