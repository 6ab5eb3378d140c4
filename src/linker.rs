use std::collections::HashSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, ErrorKindTag, Result};

/// Outcome of one source file handed to the [`Linker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResult {
    /// A new hardlink now exists at `destination`.
    Linked { source: PathBuf, destination: PathBuf },
    /// Something already occupied `destination`; it was left untouched.
    Skipped { source: PathBuf, destination: PathBuf },
    /// Dry run: `destination` would have been created.
    Planned { source: PathBuf, destination: PathBuf },
}

impl LinkResult {
    pub fn destination(&self) -> &Path {
        match self {
            Self::Linked { destination, .. }
            | Self::Skipped { destination, .. }
            | Self::Planned { destination, .. } => destination,
        }
    }

    pub fn source(&self) -> &Path {
        match self {
            Self::Linked { source, .. }
            | Self::Skipped { source, .. }
            | Self::Planned { source, .. } => source,
        }
    }
}

/// Hardlinks source files into a single flat destination directory.
#[derive(Debug, Clone)]
pub struct Linker {
    destination: PathBuf,
    dry_run: bool,
}

impl Linker {
    /// # Errors
    /// [`Error::NotFound`] when `destination` is missing or not a directory.
    /// Nothing is touched in that case.
    pub fn new(destination: impl Into<PathBuf>) -> Result<Self> {
        let destination = destination.into();
        if !destination.is_dir() {
            return Err(Error::NotFound { path: destination });
        }

        Ok(Self {
            destination,
            dry_run: false,
        })
    }

    /// Report what would be linked without creating anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Lazily link every source. Each item is the outcome for one source;
    /// a failed file yields `Err` and the remaining sources are still
    /// processed.
    pub fn link<I>(&self, sources: I) -> Links<'_, I::IntoIter>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Links {
            linker: self,
            sources: sources.into_iter(),
            planned: HashSet::new(),
        }
    }

    fn link_one(&self, source: PathBuf, planned: &mut HashSet<OsString>) -> Result<LinkResult> {
        let Some(file_name) = source.file_name().map(|n| n.to_os_string()) else {
            return Err(Error::io(
                &source,
                std::io::Error::new(ErrorKind::InvalidInput, "source path has no file name"),
            ));
        };
        let destination = self.destination.join(&file_name);

        // Skip anything already there, even if the source vanished since the
        // scan; dangling symlinks count as present.
        if std::fs::symlink_metadata(&destination).is_ok() {
            debug!(destination = %destination.display(), "Destination exists, skipping");
            return Ok(LinkResult::Skipped {
                source,
                destination,
            });
        }

        if self.dry_run {
            if !planned.insert(file_name) {
                return Ok(LinkResult::Skipped {
                    source,
                    destination,
                });
            }
            info!(
                "[Dry Run] Would hardlink '{}' to '{}'",
                source.display(),
                destination.display()
            );
            return Ok(LinkResult::Planned {
                source,
                destination,
            });
        }

        match link_if_absent(&source, &destination) {
            Ok(true) => {
                debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "Hardlinked"
                );
                Ok(LinkResult::Linked {
                    source,
                    destination,
                })
            }
            Ok(false) => {
                debug!(destination = %destination.display(), "Destination appeared concurrently, skipping");
                Ok(LinkResult::Skipped {
                    source,
                    destination,
                })
            }
            Err(e) => Err(Error::link(&source, &destination, e)),
        }
    }
}

/// Hardlink the file `source` resolves to at `destination`.
///
/// Returns `Ok(false)` when `destination` already exists. link(2) never
/// replaces an existing entry, so a writer that wins the race leaves us with a
/// skip rather than an error. The source is resolved first because
/// `hard_link` would otherwise link a symlink itself instead of its data.
fn link_if_absent(source: &Path, destination: &Path) -> std::io::Result<bool> {
    let target = std::fs::canonicalize(source)?;
    match std::fs::hard_link(&target, destination) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Lazy linking pass returned by [`Linker::link`].
pub struct Links<'a, I> {
    linker: &'a Linker,
    sources: I,
    planned: HashSet<OsString>,
}

impl<'a, I> Links<'a, I>
where
    I: Iterator<Item = PathBuf>,
{
    /// Only the destinations actually created. Skips are dropped, failures
    /// are passed through.
    pub fn created(self) -> impl Iterator<Item = Result<PathBuf>> + 'a
    where
        I: 'a,
    {
        self.filter_map(|outcome| match outcome {
            Ok(LinkResult::Linked { destination, .. }) => Some(Ok(destination)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Drive the pass to completion and summarise it.
    pub fn into_report(self) -> LinkReport {
        self.collect()
    }
}

impl<I> Iterator for Links<'_, I>
where
    I: Iterator<Item = PathBuf>,
{
    type Item = Result<LinkResult>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.sources.next()?;
        Some(self.linker.link_one(source, &mut self.planned))
    }
}

/// A file the linker could not handle.
#[derive(Debug, Serialize)]
pub struct LinkFailure {
    pub source: PathBuf,
    pub kind: ErrorKindTag,
    pub message: String,
    #[serde(skip)]
    pub error: Error,
}

/// Batch summary of a linking pass.
#[derive(Debug, Default, Serialize)]
pub struct LinkReport {
    pub linked: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub planned: Vec<PathBuf>,
    pub failed: Vec<LinkFailure>,
}

impl LinkReport {
    pub fn push(&mut self, outcome: Result<LinkResult>) {
        match outcome {
            Ok(LinkResult::Linked { destination, .. }) => self.linked.push(destination),
            Ok(LinkResult::Skipped { destination, .. }) => self.skipped.push(destination),
            Ok(LinkResult::Planned { destination, .. }) => self.planned.push(destination),
            Err(error) => {
                let source = match &error {
                    Error::CrossDevice { from, .. } => from.clone(),
                    Error::Io { path, .. } => path.clone(),
                    _ => PathBuf::new(),
                };
                warn!(source = %source.display(), "{error}");
                self.failed.push(LinkFailure {
                    source,
                    kind: error.kind(),
                    message: error.to_string(),
                    error,
                });
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FromIterator<Result<LinkResult>> for LinkReport {
    fn from_iter<T: IntoIterator<Item = Result<LinkResult>>>(iter: T) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}

/// Convenience form of [`Linker`]: destinations created for `sources`.
pub fn link<I>(sources: I, destination: impl Into<PathBuf>) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = PathBuf>,
{
    let linker = Linker::new(destination)?;
    linker.link(sources).created().collect()
}
