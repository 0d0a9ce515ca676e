//! fpm - apply YAML change files to game catalog XML files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use clap::{ArgAction, Parser, Subcommand};
use fpmeta::constants::WHITELIST_FILE;
use fpmeta::{
    explain, run_batch_files, BatchResult, ChangeSet, ChangesParser, CreatableElements,
    DocumentSink, MergeConfig, NodeRef, SingleFlight,
};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Batch metadata editor for game catalog XML files
#[derive(Parser)]
#[command(name = "fpm")]
#[command(version)]
#[command(about = "Apply YAML change files to game catalog XML files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a changes file without touching any XML
    #[command(visible_alias = "c")]
    Check {
        /// Changes file
        changes: PathBuf,
    },

    /// Describe what a changes file will do
    #[command(visible_alias = "e")]
    Explain {
        /// Changes file
        changes: PathBuf,
    },

    /// Apply a changes file to XML files
    #[command(visible_alias = "a")]
    Apply {
        /// Changes file
        changes: PathBuf,
        /// XML files, or directories whose *.xml files are searched in name order
        #[arg(required = true)]
        xml: Vec<PathBuf>,

        /// File listing the elements that may be created, one per line
        #[arg(short, long, default_value = WHITELIST_FILE)]
        whitelist: PathBuf,

        /// Directory receiving a copy of every file before it is overwritten
        #[arg(short, long, default_value = "xmlbackups")]
        backup_dir: PathBuf,

        /// Merge and report without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { changes } => run_check(&changes),
        Commands::Explain { changes } => run_explain(&changes),
        Commands::Apply {
            changes,
            xml,
            whitelist,
            backup_dir,
            dry_run,
        } => run_apply(&changes, &xml, &whitelist, &backup_dir, dry_run),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Installs a stderr subscriber. `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .try_init()
        .ok();
}

fn parse_changes(path: &Path, config: &MergeConfig) -> CliResult<ChangeSet> {
    eprintln!("Parsing changes: {}", path.display());
    Ok(ChangesParser::new(&config.aliases).parse_file(path)?)
}

/// Parses and validates a changes file.
fn run_check(changes_path: &Path) -> CliResult<bool> {
    let changes = parse_changes(changes_path, &MergeConfig::default())?;
    println!("{} games in {}", changes.len(), changes_path.display());
    Ok(true)
}

/// Prints the explanation of a changes file.
fn run_explain(changes_path: &Path) -> CliResult<bool> {
    let changes = parse_changes(changes_path, &MergeConfig::default())?;
    print!("{}", explain(&changes)?);
    Ok(true)
}

/// Applies a changes file. Returns false if any game failed or was not found.
fn run_apply(
    changes_path: &Path,
    xml_paths: &[PathBuf],
    whitelist: &Path,
    backup_dir: &Path,
    dry_run: bool,
) -> CliResult<bool> {
    let config = MergeConfig::with_creatable(load_whitelist(whitelist)?);
    // Fatal parse errors stop here, before any XML is opened
    let changes = parse_changes(changes_path, &config)?;
    let documents = expand_xml_paths(xml_paths)?;
    eprintln!(
        "Applying {} games to {} XML files...",
        changes.len(),
        documents.len()
    );

    let flight = SingleFlight::new();
    let Some(_token) = flight.try_start() else {
        return Err("another batch is already running".into());
    };

    let mut sink: Box<dyn DocumentSink + Send> = if dry_run {
        Box::new(DryRun)
    } else {
        Box::new(BackupWriter::new(backup_dir))
    };

    let result = thread::scope(|scope| {
        thread::Builder::new()
            .name("fpm-batch".to_string())
            .spawn_scoped(scope, || {
                run_batch_files(changes, &documents, &config, sink.as_mut())
            })?
            .join()
            .map_err(|_| io::Error::other("batch worker panicked"))
    })??;

    report(&result, dry_run);
    Ok(!result.has_errors())
}

/// Loads the whitelist. A missing file means nothing may be created.
fn load_whitelist(path: &Path) -> CliResult<CreatableElements> {
    match CreatableElements::load(path) {
        Ok(creatable) => {
            info!(path = %path.display(), count = creatable.len(), "loaded elements whitelist");
            Ok(creatable)
        }
        Err(fpmeta::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "elements whitelist not found");
            eprintln!(
                "Warning: unable to load {}. No elements will be created.",
                path.display()
            );
            Ok(CreatableElements::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Expands directories into their `*.xml` files, sorted by name.
fn expand_xml_paths(paths: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for path in paths {
        if !path.is_dir() {
            documents.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        found.sort();
        documents.extend(found);
    }
    Ok(documents)
}

fn report(result: &BatchResult, dry_run: bool) {
    for document in result.documents.iter().filter(|d| d.needs_write()) {
        let verb = if dry_run { "Would change" } else { "Changes made to" };
        println!("=== {} {} ===", verb, document.name);
        match explain(&document.applied) {
            Ok(text) => print!("{}", text),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    for (document, game_id, err) in result.failures() {
        eprintln!("{} ({})\n      {}\n", game_id, document, err);
    }
    for game_id in &result.not_found {
        eprintln!("Game with ID '{}' could not be found\n", game_id);
    }

    let files = result.documents.iter().filter(|d| d.needs_write()).count();
    let updated: usize = result.documents.iter().map(|d| d.elements_updated).sum();
    let created: usize = result.documents.iter().map(|d| d.elements_created).sum();
    let apps: usize = result.documents.iter().map(|d| d.applications_created).sum();
    eprintln!(
        "Changed {} games in {} files ({} elements updated, {} created, {} additional applications created).",
        result.changed_count(),
        files,
        updated,
        created,
        apps
    );
    if result.has_errors() {
        eprintln!(
            "{} games failed and {} were not found.",
            result.failures().count(),
            result.not_found.len()
        );
    }
}

/// Copies each file into the backup directory, then rewrites it in place.
struct BackupWriter {
    backup_dir: PathBuf,
}

impl BackupWriter {
    fn new(backup_dir: &Path) -> Self {
        BackupWriter {
            backup_dir: backup_dir.to_path_buf(),
        }
    }
}

impl DocumentSink for BackupWriter {
    fn store(&mut self, path: &Path, root: &NodeRef) -> fpmeta::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::other(format!("not a file: {}", path.display())))?;
        fs::create_dir_all(&self.backup_dir)?;
        let backup = self.backup_dir.join(file_name);
        fs::copy(path, &backup)?;
        info!(path = %path.display(), backup = %backup.display(), "backed up document");

        fpmeta::InPlaceWriter.store(path, root)
    }
}

/// Discards every document.
struct DryRun;

impl DocumentSink for DryRun {
    fn store(&mut self, path: &Path, _root: &NodeRef) -> fpmeta::Result<()> {
        info!(path = %path.display(), "dry run, not writing");
        Ok(())
    }
}
