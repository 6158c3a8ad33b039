//! Record path normalization.
//!
//! Every page and media record carries a logical site path such as
//! `/blog/2024/index.html`. The same string is the record's unique key and the
//! artifact's location below the output root, so it is canonicalized once, when
//! the record is written or loaded:
//!
//! ```text
//! "index.html"        → "/index.html"
//! "b//c"              → "/b/c"
//! "a/./b/../c"        → "/a/c"
//! "../../etc/passwd"  → "/etc/passwd"   (never climbs above the root)
//! "b/c/"              → rejected: directory path
//! ""  "/"  "a/.."     → rejected: root
//! ```
//!
//! A trailing separator survives normalization on purpose (`a/b/../` becomes
//! `/a/`), which is what lets directory-like input be told apart from a file
//! path and rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{0}' resolves to the site root")]
    Root(String),
    #[error("path '{0}' is a directory, not a file")]
    Directory(String),
    #[error("path '{raw}' has an invalid segment '{segment}'")]
    InvalidSegment { raw: String, segment: String },
}

/// A canonical, absolute, non-directory site path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordPath(String);

impl RecordPath {
    /// Normalize and validate a raw record path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let normalized = normalize(raw);
        if normalized == "/" {
            return Err(PathError::Root(raw.to_string()));
        }
        if normalized.ends_with('/') {
            return Err(PathError::Directory(raw.to_string()));
        }
        if let Some(segment) = normalized
            .split('/')
            .find(|s| s.contains('\0') || s.contains('\\'))
        {
            return Err(PathError::InvalidSegment {
                raw: raw.to_string(),
                segment: segment.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its leading separator, e.g. `blog/index.html`.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// Parent directory as a site path (`/` for top-level files).
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &self.0[..idx],
        }
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Location of this record's artifact below `root`.
    ///
    /// Joins the *relative* form: joining the absolute form would replace
    /// `root` entirely.
    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(self.relative())
    }
}

/// Collapse separators, `.` and `..` the way a POSIX path normalizer does,
/// after forcing a single leading separator. Keeps a trailing separator.
fn normalize(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let trailing = raw.ends_with('/');

    let mut out = String::with_capacity(raw.len() + 1);
    out.push('/');
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push('/');
    }
    out
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordPath {
    type Error = PathError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RecordPath> for String {
    fn from(path: RecordPath) -> Self {
        path.0
    }
}

impl std::str::FromStr for RecordPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}
