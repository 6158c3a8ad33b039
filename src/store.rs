//! Read-only record store boundary.
//!
//! The generator never queries a database directly. It sees the content store
//! through [`RecordStore`], which exposes exactly the reads the pipeline
//! needs: list every page (resolved with its template), list every media
//! file, and fetch one record by id.
//!
//! [`MemoryStore`] is the bundled implementation. Tests build it in code; the
//! CLI loads it from a JSON records file:
//!
//! ```json
//! {
//!   "templates": [{ "id": "base", "name": "Base", "body": "<h1>{{page.title}}</h1>" }],
//!   "pages":     [{ "id": "home", "path": "index.html", "template": "base", "title": "Home" }],
//!   "media":     [{ "id": "logo", "path": "img/logo.png", "source": "logo.png" }]
//! }
//! ```
//!
//! Paths are normalized while the file is parsed, so an invalid path fails the
//! load and never reaches generation.

use crate::model::{MediaFile, Page, RecordId, RecordKind, ResolvedPage, Template};
use crate::path::RecordPath;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {kind} '{id}': {reason}")]
    InvalidRecord {
        kind: &'static str,
        id: RecordId,
        reason: String,
    },
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: RecordId },
    #[error("path {path} is already used by {owner_kind} '{owner}'")]
    DuplicatePath {
        path: RecordPath,
        owner_kind: RecordKind,
        owner: RecordId,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The reads the generation pipeline performs against the content store.
///
/// Implementations must be shareable across worker threads.
pub trait RecordStore: Send + Sync {
    /// Every page, each resolved with its template (if the reference resolves).
    fn list_pages(&self) -> Result<Vec<ResolvedPage>, StoreError>;

    /// Every media file.
    fn list_media(&self) -> Result<Vec<MediaFile>, StoreError>;

    /// One page resolved with its template, or `None` for an unknown id.
    fn page(&self, id: &RecordId) -> Result<Option<ResolvedPage>, StoreError>;

    /// One media file, or `None` for an unknown id.
    fn media(&self, id: &RecordId) -> Result<Option<MediaFile>, StoreError>;
}

/// In-memory record store.
///
/// Enforces the integrity rules a real store would: template names are
/// non-empty, ids are unique per kind, and no two records share an output
/// path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    templates: BTreeMap<RecordId, Template>,
    pages: BTreeMap<RecordId, Page>,
    media: BTreeMap<RecordId, MediaFile>,
    paths: HashMap<RecordPath, (RecordKind, RecordId)>,
}

/// On-disk shape of a records file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RecordsFile {
    templates: Vec<Template>,
    pages: Vec<Page>,
    media: Vec<MediaFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON records file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build a store from JSON records, validating every insert.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let file: RecordsFile = serde_json::from_str(json)?;
        let mut store = Self::new();
        for template in file.templates {
            store.insert_template(template)?;
        }
        for page in file.pages {
            store.insert_page(page)?;
        }
        for media in file.media {
            store.insert_media(media)?;
        }
        Ok(store)
    }

    pub fn insert_template(&mut self, template: Template) -> Result<(), StoreError> {
        if template.name.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                kind: "template",
                id: template.id,
                reason: "template must have a name".into(),
            });
        }
        if self.templates.contains_key(&template.id) {
            return Err(StoreError::DuplicateId {
                kind: "template",
                id: template.id,
            });
        }
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Insert a page. The template reference is not checked: dangling
    /// references are legal and surface as render failures.
    pub fn insert_page(&mut self, page: Page) -> Result<(), StoreError> {
        if self.pages.contains_key(&page.id) {
            return Err(StoreError::DuplicateId {
                kind: "page",
                id: page.id,
            });
        }
        self.claim_path(&page.path, RecordKind::Page, &page.id)?;
        self.pages.insert(page.id.clone(), page);
        Ok(())
    }

    pub fn insert_media(&mut self, media: MediaFile) -> Result<(), StoreError> {
        if self.media.contains_key(&media.id) {
            return Err(StoreError::DuplicateId {
                kind: "media",
                id: media.id,
            });
        }
        self.claim_path(&media.path, RecordKind::Media, &media.id)?;
        self.media.insert(media.id.clone(), media);
        Ok(())
    }

    /// Remove a template without touching the pages that reference it.
    pub fn remove_template(&mut self, id: &RecordId) -> Option<Template> {
        self.templates.remove(id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    fn claim_path(
        &mut self,
        path: &RecordPath,
        kind: RecordKind,
        id: &RecordId,
    ) -> Result<(), StoreError> {
        if let Some((owner_kind, owner)) = self.paths.get(path) {
            return Err(StoreError::DuplicatePath {
                path: path.clone(),
                owner_kind: *owner_kind,
                owner: owner.clone(),
            });
        }
        self.paths.insert(path.clone(), (kind, id.clone()));
        Ok(())
    }

    fn resolve(&self, page: &Page) -> ResolvedPage {
        ResolvedPage {
            page: page.clone(),
            template: page
                .template
                .as_ref()
                .and_then(|id| self.templates.get(id))
                .cloned(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn list_pages(&self) -> Result<Vec<ResolvedPage>, StoreError> {
        Ok(self.pages.values().map(|p| self.resolve(p)).collect())
    }

    fn list_media(&self) -> Result<Vec<MediaFile>, StoreError> {
        Ok(self.media.values().cloned().collect())
    }

    fn page(&self, id: &RecordId) -> Result<Option<ResolvedPage>, StoreError> {
        Ok(self.pages.get(id).map(|p| self.resolve(p)))
    }

    fn media(&self, id: &RecordId) -> Result<Option<MediaFile>, StoreError> {
        Ok(self.media.get(id).cloned())
    }
}
