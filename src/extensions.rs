use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Container formats picked up when no `--extension` is given.
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".mkv", ".mp4"];

/// Immutable set of filename suffixes, each stored with its leading dot.
///
/// Matching is exact and case-sensitive against the final suffix of a file
/// name, so `movie.part1.mkv` matches `.mkv` while `.mkv` (a dotfile with no
/// suffix) and `movie.MKV` do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    suffixes: BTreeSet<String>,
}

impl ExtensionSet {
    /// Build a set from user-supplied suffixes. A missing leading dot is added.
    pub fn new<I, S>(suffixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| normalize(s.as_ref()))
            .collect::<Result<BTreeSet<String>>>()?;

        if suffixes.is_empty() {
            return Err(Error::NoExtensions);
        }

        Ok(Self { suffixes })
    }

    pub fn contains(&self, suffix: &str) -> bool {
        self.suffixes.contains(suffix)
    }

    pub fn matches(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.suffixes.contains(&format!(".{ext}")),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self {
            suffixes: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iter().collect::<Vec<_>>().join(", "))
    }
}

fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);

    if bare.is_empty() || bare.contains(['.', '/', '\\']) {
        return Err(Error::InvalidExtension(raw.to_string()));
    }

    Ok(format!(".{bare}"))
}
