//! Error taxonomy shared by the scanner, the linker and the notifier.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A root or destination directory is missing or is not a directory.
    #[error("Directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Hardlinks cannot span volumes.
    #[error("Cannot hardlink '{}' to '{}': source and destination are on different filesystems", from.display(), to.display())]
    CrossDevice { from: PathBuf, to: PathBuf },

    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory entry under '{}': {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid extension '{0}'")]
    InvalidExtension(String),

    #[error("At least one extension is required")]
    NoExtensions,

    /// The cross-seed webhook answered with anything but `204 No Content`.
    #[error("Cross-seed webhook returned HTTP {status}")]
    Notification { status: u16 },

    #[error("Cross-seed webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification used in batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKindTag {
    NotFound,
    CrossDevice,
    PermissionDenied,
    Io,
    Scan,
    Config,
    Notification,
}

impl Error {
    /// Classify a failed `hard_link(from, to)` call.
    pub fn link(from: &Path, to: &Path, source: std::io::Error) -> Self {
        if is_cross_device(&source) {
            Self::CrossDevice {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            }
        } else {
            Self::Io {
                path: from.to_path_buf(),
                source,
            }
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKindTag {
        match self {
            Self::NotFound { .. } => ErrorKindTag::NotFound,
            Self::CrossDevice { .. } => ErrorKindTag::CrossDevice,
            Self::Io { source, .. } if source.kind() == ErrorKind::PermissionDenied => {
                ErrorKindTag::PermissionDenied
            }
            Self::Io { .. } => ErrorKindTag::Io,
            Self::Scan { .. } => ErrorKindTag::Scan,
            Self::InvalidExtension(_) | Self::NoExtensions => ErrorKindTag::Config,
            Self::Notification { .. } | Self::Http(_) => ErrorKindTag::Notification,
        }
    }
}

fn is_cross_device(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::CrossesDevices
}
