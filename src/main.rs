use clap::{Parser, Subcommand};
use pagewright::artifact::RemoveOutcome;
use pagewright::config::{self, ConfigError, GeneratorConfig};
use pagewright::generate::{RecordFailure, SiteGenerator};
use pagewright::model::{RecordId, RecordKind, RecordRef};
use pagewright::output;
use pagewright::store::{MemoryStore, RecordStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Compile content records into a static site")]
#[command(long_about = "\
Compile content records into a static site

Pages are rendered through their template and written to <output>/<path>.
Media files are copied verbatim from the upload directory to <output>/<path>.
Deleting a record removes exactly its generated file.

Records file (JSON):

  {
    \"templates\": [{ \"id\": \"base\", \"name\": \"Base\", \"body\": \"<h1>{{page.title}}</h1>{{{page.body}}}\" }],
    \"pages\":     [{ \"id\": \"home\", \"path\": \"index.html\", \"template\": \"base\", \"title\": \"Home\" }],
    \"media\":     [{ \"id\": \"logo\", \"path\": \"img/logo.png\", \"source\": \"logo.png\" }]
  }

Template context: {{page.title}}, {{page.body}}, {{page.path}}. Double braces
escape HTML, triple braces insert raw text.

Run 'pagewright gen-config' to generate a documented pagewright.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "pagewright.toml", global = true)]
    config: PathBuf,

    /// Records file to generate from
    #[arg(long, default_value = "records.json", global = true)]
    records: PathBuf,

    /// Output root (overrides output_root from the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Upload root for relative media sources (overrides upload_root)
    #[arg(long, global = true)]
    uploads: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every page and media file
    Generate,
    /// Generate a single page
    Page { id: String },
    /// Copy a single media file
    Media { id: String },
    /// Remove the generated file of a page
    DeletePage { id: String },
    /// Remove the generated file of a media record
    DeleteMedia { id: String },
    /// Validate the records file and print its inventory
    Check,
    /// Print a stock pagewright.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            ExitCode::SUCCESS
        }
        Command::Generate => {
            let (settings, store) = open(&cli)?;
            let generator = Arc::new(SiteGenerator::new(settings, store)?);
            let output_root = generator.config().output_root.clone();

            let (tx, rx) = mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_event(&event, &output_root);
                }
            });

            let handle = generator.spawn_all(Some(tx));
            let cancel = handle.cancel_token();
            ctrlc::set_handler(move || {
                eprintln!("Cancelling: waiting for records in flight to finish");
                cancel.cancel();
            })?;

            let report = handle.join()?;
            printer.join().map_err(|_| "progress printer panicked")?;
            output::print_report(&report);
            exit_code(report.is_success())
        }
        Command::Page { id } => {
            let (settings, store) = open(&cli)?;
            let generator = SiteGenerator::new(settings, store)?;
            let id = RecordId::new(id.as_str());
            let result = generator
                .generate_page(&id)
                .map(|path| path.display().to_string());
            print_single(RecordRef::unresolved(RecordKind::Page, id), result)
        }
        Command::Media { id } => {
            let (settings, store) = open(&cli)?;
            let generator = SiteGenerator::new(settings, store)?;
            let id = RecordId::new(id.as_str());
            let result = generator
                .generate_media(&id)
                .map(|path| path.display().to_string());
            print_single(RecordRef::unresolved(RecordKind::Media, id), result)
        }
        Command::DeletePage { id } => {
            let (settings, store) = open(&cli)?;
            let generator = SiteGenerator::new(settings, store)?;
            let id = RecordId::new(id.as_str());
            let result = generator.delete_page(&id).map(describe_removal);
            print_single(RecordRef::unresolved(RecordKind::Page, id), result)
        }
        Command::DeleteMedia { id } => {
            let (settings, store) = open(&cli)?;
            let generator = SiteGenerator::new(settings, store)?;
            let id = RecordId::new(id.as_str());
            let result = generator.delete_media(&id).map(describe_removal);
            print_single(RecordRef::unresolved(RecordKind::Media, id), result)
        }
        Command::Check => {
            let (settings, store) = open(&cli)?;
            println!("==> Checking {}", cli.records.display());
            let templates: Vec<_> = store.templates().cloned().collect();
            let pages = store.list_pages()?;
            let media = store.list_media()?;
            let broken = output::print_inventory(&templates, &pages, &media);

            let missing: Vec<_> = media
                .iter()
                .filter(|m| !settings.media_source(&m.source).is_file())
                .collect();
            for m in &missing {
                println!(
                    "Missing source: media {} {} ({})",
                    m.id,
                    m.path,
                    settings.media_source(&m.source).display()
                );
            }

            let valid = broken == 0 && missing.is_empty();
            if valid {
                println!("==> Records are valid");
            }
            exit_code(valid)
        }
    };

    Ok(code)
}

/// Settings and records for every command that touches the output root.
fn open(cli: &Cli) -> Result<(GeneratorConfig, MemoryStore), Box<dyn std::error::Error>> {
    let settings = load_settings(cli)?;
    let store = MemoryStore::load(&cli.records)?;
    Ok((settings, store))
}

/// Config file merged over stock defaults, then CLI root overrides.
fn load_settings(cli: &Cli) -> Result<GeneratorConfig, ConfigError> {
    let mut settings = config::load_config(&cli.config)?;
    if let Some(output) = &cli.output {
        settings.output_root = output.clone();
    }
    if let Some(uploads) = &cli.uploads {
        settings.upload_root = uploads.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn describe_removal(outcome: RemoveOutcome) -> String {
    match outcome {
        RemoveOutcome::Removed => "removed".to_string(),
        RemoveOutcome::Absent => "nothing to remove".to_string(),
    }
}

fn print_single(record: RecordRef, result: Result<String, RecordFailure>) -> ExitCode {
    for line in output::format_single(&record, &result) {
        println!("{}", line);
    }
    exit_code(result.is_ok())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Initialize tracing on stderr with the specified verbosity level.
///
/// 0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE. `RUST_LOG` directives are
/// honored on top.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
