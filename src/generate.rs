//! Site generation.
//!
//! Drives the per-record pipeline over a record store and an output root:
//!
//! ```text
//! page:    Pending → Rendering → Provisioning → Writing → Done
//! media:   Pending → Provisioning → Writing → Done
//! delete:  Pending → Removing → Done
//! ```
//!
//! Any stage can fail, and a failure is terminal for that record's current
//! invocation: nothing is retried and nothing is rolled back. A page whose
//! template is missing fails before provisioning, so a stale artifact from an
//! earlier run stays exactly as it was.
//!
//! ## Full sweeps
//!
//! [`SiteGenerator::generate_all`] runs one independent pipeline per record on
//! a rayon pool sized from `generation.max_workers`. Records have no ordering
//! relative to each other. The call returns once every pipeline has finished
//! and hands back a [`SiteReport`] that aggregates the failures; one record
//! failing never stops the others.
//!
//! A [`CancelToken`] stops the sweep from *starting* further records. Records
//! already in flight run to completion (or failure), and with atomic writes
//! no artifact is ever left half-written. Records that never started are
//! listed in [`SiteReport::skipped`].
//!
//! Progress is reported through an optional channel of [`GenerateEvent`]s so a
//! CLI can print as records complete.

use crate::artifact::{self, ArtifactError, RemoveOutcome};
use crate::config::{self, GeneratorConfig};
use crate::model::{MediaFile, RecordId, RecordKind, RecordRef, ResolvedPage};
use crate::path::RecordPath;
use crate::render::{page_context, render};
use crate::store::{RecordStore, StoreError};
use rayon::prelude::*;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a whole sweep. Per-record problems are
/// [`RecordFailure`]s instead.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("generation thread panicked")]
    Panicked,
}

/// Pipeline stage a record failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Render,
    Provision,
    Write,
    Remove,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolve => "resolve",
            Stage::Render => "render",
            Stage::Provision => "provision",
            Stage::Write => "write",
            Stage::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FailureKind {
    #[error("record not found")]
    NotFound,
    #[error("page has no template")]
    NoTemplate,
    #[error("template '{0}' not found")]
    MissingTemplate(RecordId),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One record's failed pipeline: which record, in which stage, and why.
#[derive(Error, Debug)]
#[error("{record}: {stage} failed: {kind}")]
pub struct RecordFailure {
    pub record: RecordRef,
    pub stage: Stage,
    #[source]
    pub kind: FailureKind,
}

impl RecordFailure {
    fn new(record: RecordRef, stage: Stage, kind: impl Into<FailureKind>) -> Self {
        Self {
            record,
            stage,
            kind: kind.into(),
        }
    }
}

/// Shared cancellation flag for a sweep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notification emitted during a sweep.
#[derive(Debug, Clone)]
pub enum GenerateEvent {
    Started {
        pages: usize,
        media: usize,
    },
    Generated {
        record: RecordRef,
        output: PathBuf,
    },
    Failed {
        record: RecordRef,
        stage: Stage,
        message: String,
    },
    Skipped {
        record: RecordRef,
    },
    Finished {
        pages: usize,
        media: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
    },
}

/// Aggregate result of a full sweep.
#[derive(Debug, Default)]
pub struct SiteReport {
    /// Page artifacts written.
    pub pages: usize,
    /// Media artifacts written.
    pub media: usize,
    /// Every record whose pipeline failed, sorted by kind and id.
    pub failures: Vec<RecordFailure>,
    /// Records never started because the sweep was cancelled.
    pub skipped: Vec<RecordRef>,
    pub duration_ms: u64,
}

impl SiteReport {
    /// True when every record was generated.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn generated(&self) -> usize {
        self.pages + self.media
    }
}

/// Handle to a sweep running on a background thread.
pub struct GenerationHandle {
    cancel: CancelToken,
    thread: JoinHandle<Result<SiteReport, GenerateError>>,
}

impl GenerationHandle {
    /// Stop scheduling new records. In-flight records still finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until every record pipeline has finished.
    pub fn join(self) -> Result<SiteReport, GenerateError> {
        self.thread.join().map_err(|_| GenerateError::Panicked)?
    }
}

enum Job {
    Page(ResolvedPage),
    Media(MediaFile),
}

impl Job {
    fn record(&self) -> RecordRef {
        match self {
            Job::Page(resolved) => RecordRef::from(&resolved.page),
            Job::Media(media) => RecordRef::from(media),
        }
    }
}

enum Outcome {
    Generated(RecordKind),
    Failed(RecordFailure),
    Skipped(RecordRef),
}

/// Compiles records from a [`RecordStore`] into the configured output root.
pub struct SiteGenerator {
    config: GeneratorConfig,
    store: Arc<dyn RecordStore>,
    pool: rayon::ThreadPool,
}

impl SiteGenerator {
    /// Create a generator with its own bounded worker pool.
    pub fn new(
        config: GeneratorConfig,
        store: impl RecordStore + 'static,
    ) -> Result<Self, GenerateError> {
        Self::with_shared_store(config, Arc::new(store))
    }

    pub fn with_shared_store(
        config: GeneratorConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, GenerateError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config::effective_workers(&config.generation))
            .thread_name(|i| format!("pagewright-worker-{i}"))
            .build()?;
        Ok(Self {
            config,
            store,
            pool,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Generate every page and media file.
    pub fn generate_all(&self) -> Result<SiteReport, GenerateError> {
        self.generate_all_with(&CancelToken::new(), None)
    }

    /// Generate every page and media file, honoring `cancel` and reporting
    /// progress to `events`.
    pub fn generate_all_with(
        &self,
        cancel: &CancelToken,
        events: Option<Sender<GenerateEvent>>,
    ) -> Result<SiteReport, GenerateError> {
        let start = Instant::now();
        let pages = self.store.list_pages()?;
        let media = self.store.list_media()?;

        info!(
            pages = pages.len(),
            media = media.len(),
            workers = self.workers(),
            output = %self.config.output_root.display(),
            "generating site"
        );
        emit(
            &events,
            GenerateEvent::Started {
                pages: pages.len(),
                media: media.len(),
            },
        );

        let jobs: Vec<Job> = pages
            .into_iter()
            .map(Job::Page)
            .chain(media.into_iter().map(Job::Media))
            .collect();

        let outcomes: Vec<Outcome> = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| self.run_job(job, cancel, &events))
                .collect()
        });

        let mut report = SiteReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Generated(RecordKind::Page) => report.pages += 1,
                Outcome::Generated(RecordKind::Media) => report.media += 1,
                Outcome::Failed(failure) => report.failures.push(failure),
                Outcome::Skipped(record) => report.skipped.push(record),
            }
        }
        report
            .failures
            .sort_by(|a, b| (a.record.kind, &a.record.id).cmp(&(b.record.kind, &b.record.id)));
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            pages = report.pages,
            media = report.media,
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "site generation finished"
        );
        emit(
            &events,
            GenerateEvent::Finished {
                pages: report.pages,
                media: report.media,
                failed: report.failures.len(),
                skipped: report.skipped.len(),
                duration_ms: report.duration_ms,
            },
        );

        Ok(report)
    }

    /// Run a full sweep on a background thread.
    pub fn spawn_all(self: Arc<Self>, events: Option<Sender<GenerateEvent>>) -> GenerationHandle {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let thread = std::thread::spawn(move || self.generate_all_with(&token, events));
        GenerationHandle { cancel, thread }
    }

    /// Generate the artifact for one page.
    pub fn generate_page(&self, id: &RecordId) -> Result<PathBuf, RecordFailure> {
        let resolved = self.resolve_page(id)?;
        self.run_page(&resolved).inspect_err(log_failure)
    }

    /// Generate the artifact for one media file.
    pub fn generate_media(&self, id: &RecordId) -> Result<PathBuf, RecordFailure> {
        let media = self.resolve_media(id)?;
        self.run_media(&media).inspect_err(log_failure)
    }

    /// Remove the artifact of one page. Missing artifacts are not an error.
    pub fn delete_page(&self, id: &RecordId) -> Result<RemoveOutcome, RecordFailure> {
        let resolved = self.resolve_page(id)?;
        self.run_remove(RecordRef::from(&resolved.page), &resolved.page.path)
            .inspect_err(log_failure)
    }

    /// Remove the artifact of one media file. Missing artifacts are not an error.
    pub fn delete_media(&self, id: &RecordId) -> Result<RemoveOutcome, RecordFailure> {
        let media = self.resolve_media(id)?;
        self.run_remove(RecordRef::from(&media), &media.path)
            .inspect_err(log_failure)
    }

    fn resolve_page(&self, id: &RecordId) -> Result<ResolvedPage, RecordFailure> {
        let unresolved = || RecordRef::unresolved(RecordKind::Page, id.clone());
        let resolved = match self.store.page(id) {
            Ok(Some(resolved)) => Ok(resolved),
            Ok(None) => Err(RecordFailure::new(unresolved(), Stage::Resolve, FailureKind::NotFound)),
            Err(e) => Err(RecordFailure::new(unresolved(), Stage::Resolve, e)),
        };
        resolved.inspect_err(log_failure)
    }

    fn resolve_media(&self, id: &RecordId) -> Result<MediaFile, RecordFailure> {
        let unresolved = || RecordRef::unresolved(RecordKind::Media, id.clone());
        let resolved = match self.store.media(id) {
            Ok(Some(media)) => Ok(media),
            Ok(None) => Err(RecordFailure::new(unresolved(), Stage::Resolve, FailureKind::NotFound)),
            Err(e) => Err(RecordFailure::new(unresolved(), Stage::Resolve, e)),
        };
        resolved.inspect_err(log_failure)
    }

    fn run_job(
        &self,
        job: &Job,
        cancel: &CancelToken,
        events: &Option<Sender<GenerateEvent>>,
    ) -> Outcome {
        if cancel.is_cancelled() {
            let record = job.record();
            debug!(record = %record, "skipped, sweep cancelled");
            emit(events, GenerateEvent::Skipped {
                record: record.clone(),
            });
            return Outcome::Skipped(record);
        }

        let (kind, result) = match job {
            Job::Page(resolved) => (RecordKind::Page, self.run_page(resolved)),
            Job::Media(media) => (RecordKind::Media, self.run_media(media)),
        };
        match result {
            Ok(output) => {
                emit(events, GenerateEvent::Generated {
                    record: job.record(),
                    output,
                });
                Outcome::Generated(kind)
            }
            Err(failure) => {
                log_failure(&failure);
                emit(events, GenerateEvent::Failed {
                    record: failure.record.clone(),
                    stage: failure.stage,
                    message: failure.kind.to_string(),
                });
                Outcome::Failed(failure)
            }
        }
    }

    /// Render → provision → write.
    fn run_page(&self, resolved: &ResolvedPage) -> Result<PathBuf, RecordFailure> {
        let page = &resolved.page;
        let record = || RecordRef::from(page);

        let template = match (&resolved.template, &page.template) {
            (Some(template), _) => template,
            (None, Some(reference)) => {
                return Err(RecordFailure::new(
                    record(),
                    Stage::Render,
                    FailureKind::MissingTemplate(reference.clone()),
                ));
            }
            (None, None) => {
                return Err(RecordFailure::new(record(), Stage::Render, FailureKind::NoTemplate));
            }
        };
        let content = render(&template.body, &page_context(page));

        let root = &self.config.output_root;
        artifact::ensure_dir(&artifact::parent_dir(root, &page.path))
            .map_err(|e| RecordFailure::new(record(), Stage::Provision, e))?;
        let output = artifact::write_page(root, &page.path, &content, self.config.write_mode())
            .map_err(|e| RecordFailure::new(record(), Stage::Write, e))?;

        debug!(path = %page.path, output = %output.display(), template = %template.name, "wrote page");
        Ok(output)
    }

    /// Provision → copy.
    fn run_media(&self, media: &MediaFile) -> Result<PathBuf, RecordFailure> {
        let record = || RecordRef::from(media);
        let root = &self.config.output_root;
        let source = self.config.media_source(&media.source);

        artifact::ensure_dir(&artifact::parent_dir(root, &media.path))
            .map_err(|e| RecordFailure::new(record(), Stage::Provision, e))?;
        let output = artifact::write_media(root, &media.path, &source, self.config.write_mode())
            .map_err(|e| RecordFailure::new(record(), Stage::Write, e))?;

        debug!(path = %media.path, source = %source.display(), "copied media");
        Ok(output)
    }

    fn run_remove(&self, record: RecordRef, path: &RecordPath) -> Result<RemoveOutcome, RecordFailure> {
        let outcome = artifact::remove(&self.config.output_root, path)
            .map_err(|e| RecordFailure::new(record.clone(), Stage::Remove, e))?;
        match outcome {
            RemoveOutcome::Removed => debug!(record = %record, "removed artifact"),
            RemoveOutcome::Absent => debug!(record = %record, "no artifact to remove"),
        }
        Ok(outcome)
    }
}

fn emit(events: &Option<Sender<GenerateEvent>>, event: GenerateEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching.
        tx.send(event).ok();
    }
}

fn log_failure(failure: &RecordFailure) {
    warn!(
        record = %failure.record,
        stage = %failure.stage,
        error = %failure.kind,
        "record generation failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, Template};
    use crate::store::MemoryStore;
    use crate::test_helpers::{generated_files, media, page, template, Roots};
    use std::fs;
    use std::sync::mpsc;

    fn generator(roots: &Roots, store: MemoryStore) -> SiteGenerator {
        SiteGenerator::new(roots.config(), store).unwrap()
    }

    fn hello_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .insert_template(template("base", "Hello {{page.title}}"))
            .unwrap();
        store
            .insert_page(page("home", "/index.html", Some("base"), "Home"))
            .unwrap();
        store
    }

    /// Store whose every read fails.
    struct BrokenStore;

    impl RecordStore for BrokenStore {
        fn list_pages(&self) -> Result<Vec<ResolvedPage>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn list_media(&self) -> Result<Vec<MediaFile>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn page(&self, _: &RecordId) -> Result<Option<ResolvedPage>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        fn media(&self, _: &RecordId) -> Result<Option<MediaFile>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn generate_page_renders_template() {
        let roots = Roots::new();
        let generator = generator(&roots, hello_store());

        let output = generator.generate_page(&RecordId::new("home")).unwrap();

        assert_eq!(output, roots.output().join("index.html"));
        assert_eq!(fs::read_to_string(output).unwrap(), "Hello Home");
    }

    #[test]
    fn generate_page_provisions_nested_directories() {
        let roots = Roots::new();
        let mut store = hello_store();
        store
            .insert_page(page("deep", "/a/b/c/index.html", Some("base"), "Deep"))
            .unwrap();
        let generator = generator(&roots, store);

        generator.generate_page(&RecordId::new("deep")).unwrap();

        assert!(roots.output().join("a/b").is_dir());
        assert_eq!(
            fs::read_to_string(roots.output().join("a/b/c/index.html")).unwrap(),
            "Hello Deep"
        );
    }

    #[test]
    fn generate_page_twice_is_identical() {
        let roots = Roots::new();
        let generator = generator(&roots, hello_store());
        let id = RecordId::new("home");

        let first = fs::read(generator.generate_page(&id).unwrap()).unwrap();
        let second = fs::read(generator.generate_page(&id).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_template_leaves_stale_artifact_untouched() {
        let roots = Roots::new();
        let mut store = hello_store();
        store.remove_template(&RecordId::new("base"));
        fs::write(roots.output().join("index.html"), "stale").unwrap();
        let generator = generator(&roots, store);

        let failure = generator.generate_page(&RecordId::new("home")).unwrap_err();

        assert_eq!(failure.stage, Stage::Render);
        assert!(matches!(failure.kind, FailureKind::MissingTemplate(ref id) if id.as_str() == "base"));
        assert_eq!(
            fs::read_to_string(roots.output().join("index.html")).unwrap(),
            "stale"
        );
    }

    #[test]
    fn page_without_template_reference_fails_before_provisioning() {
        let roots = Roots::new();
        let mut store = MemoryStore::new();
        store
            .insert_page(page("bare", "/new/dir/page.html", None, "Bare"))
            .unwrap();
        let generator = generator(&roots, store);

        let failure = generator.generate_page(&RecordId::new("bare")).unwrap_err();

        assert!(matches!(failure.kind, FailureKind::NoTemplate));
        assert!(!roots.output().join("new").exists());
    }

    #[test]
    fn unknown_page_id_is_not_found() {
        let roots = Roots::new();
        let generator = generator(&roots, MemoryStore::new());

        let failure = generator.generate_page(&RecordId::new("ghost")).unwrap_err();

        assert_eq!(failure.stage, Stage::Resolve);
        assert!(matches!(failure.kind, FailureKind::NotFound));
        assert!(failure.record.path.is_none());
    }

    #[test]
    fn provision_failure_is_reported() {
        let roots = Roots::new();
        let mut store = hello_store();
        store
            .insert_page(page("blocked", "/blocker/page.html", Some("base"), "B"))
            .unwrap();
        fs::write(roots.output().join("blocker"), "a file, not a directory").unwrap();
        let generator = generator(&roots, store);

        let failure = generator.generate_page(&RecordId::new("blocked")).unwrap_err();

        assert_eq!(failure.stage, Stage::Provision);
    }

    #[test]
    fn generate_media_copies_relative_source() {
        let roots = Roots::new();
        roots.upload("logos/logo.png", b"\x89PNG fake bytes");
        let mut store = MemoryStore::new();
        store
            .insert_media(media("logo", "img/logo.png", "logos/logo.png"))
            .unwrap();
        let generator = generator(&roots, store);

        let output = generator.generate_media(&RecordId::new("logo")).unwrap();

        assert_eq!(output, roots.output().join("img/logo.png"));
        assert_eq!(fs::read(output).unwrap(), b"\x89PNG fake bytes");
    }

    #[test]
    fn generate_media_accepts_absolute_source() {
        let roots = Roots::new();
        let absolute = roots.upload("abs.txt", b"absolute");
        let mut store = MemoryStore::new();
        store
            .insert_media(media("abs", "files/abs.txt", absolute.to_str().unwrap()))
            .unwrap();
        let generator = generator(&roots, store);

        generator.generate_media(&RecordId::new("abs")).unwrap();

        assert_eq!(fs::read(roots.output().join("files/abs.txt")).unwrap(), b"absolute");
    }

    #[test]
    fn missing_media_source_fails_in_write_stage() {
        let roots = Roots::new();
        let mut store = MemoryStore::new();
        store
            .insert_media(media("gone", "img/gone.png", "gone.png"))
            .unwrap();
        let generator = generator(&roots, store);

        let failure = generator.generate_media(&RecordId::new("gone")).unwrap_err();

        assert_eq!(failure.stage, Stage::Write);
        assert!(matches!(
            failure.kind,
            FailureKind::Artifact(ArtifactError::SourceMissing(_))
        ));
    }

    #[test]
    fn delete_page_is_idempotent() {
        let roots = Roots::new();
        let generator = generator(&roots, hello_store());
        let id = RecordId::new("home");
        generator.generate_page(&id).unwrap();

        assert_eq!(generator.delete_page(&id).unwrap(), RemoveOutcome::Removed);
        assert_eq!(generator.delete_page(&id).unwrap(), RemoveOutcome::Absent);
        assert!(!roots.output().join("index.html").exists());
    }

    #[test]
    fn delete_media_keeps_directories() {
        let roots = Roots::new();
        roots.upload("a.bin", b"a");
        let mut store = MemoryStore::new();
        store.insert_media(media("a", "x/y/a.bin", "a.bin")).unwrap();
        let generator = generator(&roots, store);
        let id = RecordId::new("a");
        generator.generate_media(&id).unwrap();

        generator.delete_media(&id).unwrap();

        assert!(!roots.output().join("x/y/a.bin").exists());
        assert!(roots.output().join("x/y").is_dir());
    }

    #[test]
    fn generate_all_writes_every_record() {
        let roots = Roots::new();
        roots.upload("logo.png", b"logo");
        let mut store = hello_store();
        store
            .insert_page(page("about", "/about/index.html", Some("base"), "About"))
            .unwrap();
        store.insert_media(media("logo", "img/logo.png", "logo.png")).unwrap();
        let generator = generator(&roots, store);

        let report = generator.generate_all().unwrap();

        assert!(report.is_success());
        assert_eq!(report.pages, 2);
        assert_eq!(report.media, 1);
        assert_eq!(
            generated_files(roots.output()),
            vec!["about/index.html", "img/logo.png", "index.html"]
        );
    }

    #[test]
    fn generate_all_aggregates_failures_without_stopping() {
        let roots = Roots::new();
        let mut store = hello_store();
        store
            .insert_page(page("orphan", "/orphan.html", Some("deleted"), "Orphan"))
            .unwrap();
        store.insert_media(media("gone", "gone.png", "gone.png")).unwrap();
        let generator = generator(&roots, store);

        let report = generator.generate_all().unwrap();

        assert!(!report.is_success());
        assert_eq!(report.pages, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].record.kind, RecordKind::Page);
        assert_eq!(report.failures[0].stage, Stage::Render);
        assert_eq!(report.failures[1].record.kind, RecordKind::Media);
        assert_eq!(report.failures[1].stage, Stage::Write);
        assert_eq!(generated_files(roots.output()), vec!["index.html"]);
    }

    #[test]
    fn cancelled_sweep_skips_every_record() {
        let roots = Roots::new();
        let generator = generator(&roots, hello_store());
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = generator.generate_all_with(&cancel, None).unwrap();

        assert_eq!(report.generated(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(!report.is_success());
        assert!(generated_files(roots.output()).is_empty());
    }

    #[test]
    fn generate_all_emits_progress_events() {
        let roots = Roots::new();
        let generator = generator(&roots, hello_store());
        let (tx, rx) = mpsc::channel();

        generator
            .generate_all_with(&CancelToken::new(), Some(tx))
            .unwrap();
        let events: Vec<GenerateEvent> = rx.iter().collect();

        assert!(matches!(
            events.first(),
            Some(GenerateEvent::Started { pages: 1, media: 0 })
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, GenerateEvent::Generated { record, .. } if record.id.as_str() == "home")));
        assert!(matches!(
            events.last(),
            Some(GenerateEvent::Finished { pages: 1, failed: 0, .. })
        ));
    }

    #[test]
    fn spawn_all_completes_through_handle() {
        let roots = Roots::new();
        let generator = Arc::new(generator(&roots, hello_store()));

        let handle = generator.spawn_all(None);
        let report = handle.join().unwrap();

        assert_eq!(report.pages, 1);
        assert!(roots.output().join("index.html").is_file());
    }

    #[test]
    fn store_listing_error_aborts_sweep() {
        let roots = Roots::new();
        let generator = SiteGenerator::new(roots.config(), BrokenStore).unwrap();

        assert!(matches!(
            generator.generate_all(),
            Err(GenerateError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn store_error_on_single_record_is_a_resolve_failure() {
        let roots = Roots::new();
        let generator = SiteGenerator::new(roots.config(), BrokenStore).unwrap();

        let failure = generator.delete_media(&RecordId::new("m")).unwrap_err();

        assert_eq!(failure.stage, Stage::Resolve);
        assert!(matches!(failure.kind, FailureKind::Store(_)));
    }

    #[test]
    fn worker_pool_respects_max_workers() {
        let roots = Roots::new();
        let mut config = roots.config();
        config.generation.max_workers = Some(1);
        let generator = SiteGenerator::new(config, MemoryStore::new()).unwrap();
        assert_eq!(generator.workers(), 1);
    }

    #[test]
    fn direct_write_mode_generates_same_content() {
        let roots = Roots::new();
        let mut config = roots.config();
        config.generation.atomic_writes = false;
        let generator = SiteGenerator::new(config, hello_store()).unwrap();

        let output = generator.generate_page(&RecordId::new("home")).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "Hello Home");
    }

    #[test]
    fn record_failure_display_names_record_and_stage() {
        let failure = RecordFailure::new(
            RecordRef::from(&Page {
                id: RecordId::new("p"),
                path: RecordPath::parse("/p.html").unwrap(),
                template: None,
                title: String::new(),
                body: String::new(),
            }),
            Stage::Render,
            FailureKind::NoTemplate,
        );
        assert_eq!(
            failure.to_string(),
            "page p (/p.html): render failed: page has no template"
        );
    }

    #[test]
    fn template_body_rendered_per_page() {
        let roots = Roots::new();
        let mut store = MemoryStore::new();
        store
            .insert_template(Template {
                id: RecordId::new("t"),
                name: "Post".into(),
                body: "<h1>{{page.title}}</h1>{{{page.body}}}<a href=\"{{page.path}}\">".into(),
            })
            .unwrap();
        let mut post = page("post", "blog/first.html", Some("t"), "First & Best");
        post.body = "<p>Body</p>".into();
        store.insert_page(post).unwrap();
        let generator = generator(&roots, store);

        let output = generator.generate_page(&RecordId::new("post")).unwrap();

        assert_eq!(
            fs::read_to_string(output).unwrap(),
            "<h1>First &amp; Best</h1><p>Body</p><a href=\"/blog/first.html\">"
        );
    }
}
