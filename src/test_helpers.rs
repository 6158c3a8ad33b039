//! Shared test utilities for the pagewright test suite.
//!
//! Record builders that panic on invalid input, an isolated pair of
//! output/upload roots, and a listing of generated files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let roots = Roots::new();
//! let mut store = MemoryStore::new();
//! store.insert_template(template("base", "Hello {{page.title}}")).unwrap();
//! store.insert_page(page("home", "/index.html", Some("base"), "Home")).unwrap();
//!
//! let generator = SiteGenerator::new(roots.config(), store).unwrap();
//! generator.generate_all().unwrap();
//! assert_eq!(generated_files(roots.output()), vec!["index.html"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::GeneratorConfig;
use crate::model::{MediaFile, Page, RecordId, Template};
use crate::path::RecordPath;

// =========================================================================
// Record builders
// =========================================================================

/// A page at `raw_path`. Panics if the path is invalid.
pub fn page(id: &str, raw_path: &str, template: Option<&str>, title: &str) -> Page {
    Page {
        id: RecordId::new(id),
        path: parse_path(raw_path),
        template: template.map(RecordId::new),
        title: title.to_string(),
        body: String::new(),
    }
}

/// A template named after its id.
pub fn template(id: &str, body: &str) -> Template {
    Template {
        id: RecordId::new(id),
        name: format!("Template {id}"),
        body: body.to_string(),
    }
}

/// A media file copied from `source`. Panics if the path is invalid.
pub fn media(id: &str, raw_path: &str, source: &str) -> MediaFile {
    MediaFile {
        id: RecordId::new(id),
        path: parse_path(raw_path),
        source: PathBuf::from(source),
    }
}

fn parse_path(raw: &str) -> RecordPath {
    RecordPath::parse(raw).unwrap_or_else(|e| panic!("bad test path '{raw}': {e}"))
}

// =========================================================================
// Filesystem roots
// =========================================================================

/// An isolated output root and upload root, both existing and empty.
pub struct Roots {
    _tmp: TempDir,
    output: PathBuf,
    uploads: PathBuf,
}

impl Roots {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("webroot");
        let uploads = tmp.path().join("uploads");
        fs::create_dir_all(&output).unwrap();
        fs::create_dir_all(&uploads).unwrap();
        Self {
            _tmp: tmp,
            output,
            uploads,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Default config pointed at these roots.
    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig::with_roots(&self.output, &self.uploads)
    }

    /// Write an uploaded original and return its absolute path.
    pub fn upload(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.uploads.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, bytes).unwrap();
        path
    }
}

// =========================================================================
// Output inspection
// =========================================================================

/// Every regular file under `root`, as sorted `/`-separated relative paths.
pub fn generated_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry.path().strip_prefix(root).unwrap();
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
