//! Content records consumed by the generation pipeline.
//!
//! Records are owned by the record store. The pipeline only reads them and
//! manages the lifetime of the artifacts derived from them.

use crate::path::RecordPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque record identifier, unique per record kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A named template body shared by any number of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: RecordId,
    pub name: String,
    pub body: String,
}

/// A page rendered through its template to `output_root + path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: RecordId,
    pub path: RecordPath,
    /// Template reference. Pages without one, or whose template was removed,
    /// cannot be rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<RecordId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// An uploaded file copied verbatim to `output_root + path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: RecordId,
    pub path: RecordPath,
    /// Location of the uploaded original: absolute, or relative to the
    /// configured upload root.
    pub source: PathBuf,
}

/// A page together with its template, as handed out by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPage {
    pub page: Page,
    pub template: Option<Template>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Page,
    Media,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Page => f.write_str("page"),
            RecordKind::Media => f.write_str("media"),
        }
    }
}

/// Identifies a record in reports and progress events.
///
/// `path` is `None` only when the record could not be found at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub kind: RecordKind,
    pub id: RecordId,
    pub path: Option<RecordPath>,
}

impl RecordRef {
    pub fn unresolved(kind: RecordKind, id: RecordId) -> Self {
        Self {
            kind,
            id,
            path: None,
        }
    }
}

impl From<&Page> for RecordRef {
    fn from(page: &Page) -> Self {
        Self {
            kind: RecordKind::Page,
            id: page.id.clone(),
            path: Some(page.path.clone()),
        }
    }
}

impl From<&MediaFile> for RecordRef {
    fn from(media: &MediaFile) -> Self {
        Self {
            kind: RecordKind::Media,
            id: media.id.clone(),
            path: Some(media.path.clone()),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {} ({})", self.kind, self.id, path),
            None => write!(f, "{} {}", self.kind, self.id),
        }
    }
}
