//! # Pagewright
//!
//! Compiles the records of a content store into a static site on disk. Each
//! page is rendered through its template and written to `output_root + path`;
//! each uploaded media file is copied verbatim to `output_root + path`.
//! Deleting a record deletes exactly its artifact.
//!
//! # Architecture: Per-Record Pipelines
//!
//! Every record goes through its own short pipeline, independent of all other
//! records:
//!
//! ```text
//! page    store → render → provision dirs → write
//! media   store → provision dirs → copy
//! delete  store → remove
//! ```
//!
//! A full sweep ([`generate::SiteGenerator::generate_all`]) runs one pipeline
//! per record on a bounded worker pool and returns once all of them have
//! finished, with a report of everything that failed. A failing record never
//! stops the others.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`path`] | `RecordPath`: canonical `/`-rooted artifact paths, normalized on construction |
//! | [`model`] | Records: `Template`, `Page`, `MediaFile`, and report identifiers |
//! | [`store`] | `RecordStore` trait and the JSON-backed `MemoryStore` |
//! | [`render`] | Mustache-style template expansion against a JSON context |
//! | [`artifact`] | Directory provisioning, atomic artifact writes, artifact removal |
//! | [`generate`] | `SiteGenerator`: worker pool, sweeps, single-record operations, events |
//! | [`config`] | `pagewright.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting for events, reports and inventories |
//!
//! # Design Decisions
//!
//! ## Paths Are Validated Once
//!
//! A [`path::RecordPath`] can only be built through normalization, which
//! resolves `.` and `..`, collapses repeated separators and rejects directory
//! paths. Everything downstream joins it onto the output root without further
//! checks, and no artifact can land outside the root.
//!
//! ## Templates Are Data
//!
//! Templates live in the content store next to the pages that use them, so
//! the renderer is a small runtime interpreter rather than compiled markup.
//! Rendering is permissive: unknown variables expand to nothing and malformed
//! tags never fail a page.
//!
//! ## Atomic Writes
//!
//! Artifacts are written to a temporary file in the target directory and
//! renamed into place. A web server reading the output root mid-sweep sees the
//! previous artifact or the new one, never a partial file.

pub mod artifact;
pub mod config;
pub mod generate;
pub mod model;
pub mod output;
pub mod path;
pub mod render;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
