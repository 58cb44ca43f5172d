//! `crm-csv` command-line entry point.
//!
//! # Responsibility
//! - Register the operator commands (`init`, `status`, `import`, `export`).
//! - Resolve store, config and logging, then hand off to core services.
//!
//! # Invariants
//! - `status`, `import` and `export` never create a store; a missing or
//!   incomplete store is reported before any config or CSV file is read.

use clap::{Args, Parser, Subcommand, ValueEnum};
use crmcsv_core::db::{open_db, open_existing_db};
use crmcsv_core::{
    core_version, default_log_level, init_logging, load_config, ContactExportService,
    ContactImportService, EmailPolicy, ImporterConfig, NoticeLevel, SegmentKind,
    SqliteContactStore,
};
use log::error;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Import contacts from CSV into the contact store, or export them back.
#[derive(Parser)]
#[command(name = "crm-csv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Contact store database file.
    #[arg(long, env = "CRM_CSV_DB", default_value = "crm-contacts.sqlite3")]
    db: PathBuf,

    /// JSON config file (tag/list targets, email policy, export settings).
    #[arg(long, env = "CRM_CSV_CONFIG")]
    config: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "CRM_CSV_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Stderr only when unset.
    #[arg(long, env = "CRM_CSV_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or migrate the contact store
    Init,
    /// Check that the contact store is present and usable
    Status,
    /// Import contacts from a CSV file
    Import(ImportArgs),
    /// Export all contacts as CSV
    Export(ExportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// CSV file; the first row is treated as a header and discarded
    file: PathBuf,

    /// Overrides the configured email policy
    #[arg(long, value_enum)]
    email_policy: Option<PolicyArg>,
}

#[derive(Args)]
struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Prefix the CSV with download response headers
    #[arg(long)]
    http: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Strict,
    Lenient,
}

impl From<PolicyArg> for EmailPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Strict => EmailPolicy::Strict,
            PolicyArg::Lenient => EmailPolicy::Lenient,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Without a log directory stderr is shared with command output.
    let level = match (&cli.log_level, &cli.log_dir) {
        (Some(level), _) => level.clone(),
        (None, Some(_)) => default_log_level().to_string(),
        (None, None) => "warn".to_string(),
    };
    if let Err(err) = init_logging(&level, cli.log_dir.as_deref()) {
        eprintln!("[error] {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("[error] {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Init => init_store(&cli.db),
        Command::Status => status(&cli.db),
        Command::Import(args) => import(&cli.db, config_path, args),
        Command::Export(args) => export(&cli.db, config_path, args),
    }
}

/// Loaded only after the store probe passes.
fn resolve_config(path: Option<&Path>) -> CliResult<ImporterConfig> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(ImporterConfig::default()),
    }
}

fn init_store(db: &Path) -> CliResult<ExitCode> {
    let conn = open_db(db)?;
    SqliteContactStore::try_new(&conn)?;
    println!("Contact store ready at {}.", db.display());
    Ok(ExitCode::SUCCESS)
}

fn status(db: &Path) -> CliResult<ExitCode> {
    let conn = match open_existing_db(db) {
        Ok(conn) => conn,
        Err(err) => {
            println!("[error] Contact store is not installed or not available: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let store = match SqliteContactStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            println!("[error] Contact store is not usable: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!(
        "[success] Contact store is detected and ready (crm-csv {}).",
        core_version()
    );
    println!(
        "contacts={} tags={} lists={}",
        store.count_contacts()?,
        store.count_segments(SegmentKind::Tag)?,
        store.count_segments(SegmentKind::List)?
    );
    Ok(ExitCode::SUCCESS)
}

fn import(db: &Path, config_path: Option<&Path>, args: ImportArgs) -> CliResult<ExitCode> {
    let conn = open_existing_db(db)?;
    let store = SqliteContactStore::try_new(&conn)?;

    let mut config = resolve_config(config_path)?;
    if let Some(policy) = args.email_policy {
        config.email_policy = policy.into();
    }

    let service = ContactImportService::new(store, config);
    let report = service.import_file(&args.file)?;

    let mut has_error = false;
    for notice in report.notices() {
        has_error |= notice.level == NoticeLevel::Error;
        println!("{notice}");
    }

    if report.interrupted.is_some() {
        return Ok(ExitCode::FAILURE);
    }
    if has_error {
        // Some rows failed; the rest are committed.
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn export(db: &Path, config_path: Option<&Path>, args: ExportArgs) -> CliResult<ExitCode> {
    let conn = open_existing_db(db)?;
    let store = SqliteContactStore::try_new(&conn)?;
    let config = resolve_config(config_path)?;
    let service = ContactExportService::new(store, config.export);

    let summary = match (&args.output, args.http) {
        (Some(path), false) => service.export_file(path)?,
        (Some(path), true) => service.export_attachment_file(path)?,
        (None, http) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let summary = if http {
                service.export_attachment(&mut handle)?
            } else {
                service.export_csv(&mut handle)?
            };
            handle.flush()?;
            summary
        }
    };

    eprintln!("Exported {} contact(s).", summary.contacts);
    Ok(ExitCode::SUCCESS)
}
