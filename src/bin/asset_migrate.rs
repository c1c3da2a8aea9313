use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use asset_migrate::app::{App, SortTarget};
use asset_migrate::config::ConfigLoader;
use asset_migrate::error::MigrateError;
use asset_migrate::output::JsonOutput;
use asset_migrate::store::FsAssetStore;

#[derive(Parser)]
#[command(name = "asset-migrate")]
#[command(about = "Migrate ripped asset trees into a project layout and sort them by type")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./asset-migrate.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Copy mapped categories from the ripper output into the project")]
    Migrate(MigrateArgs),
    #[command(about = "Move assets into per-type folders")]
    Sort(SortArgs),
    #[command(about = "Move sorted assets back to their root folder")]
    Unsort(SortArgs),
    #[command(about = "Delete migrated files, keeping .dll files")]
    Clean(CleanArgs),
}

#[derive(Args)]
struct MigrateArgs {
    #[arg(long)]
    source: Utf8PathBuf,

    #[arg(long)]
    destination: Utf8PathBuf,

    /// Skip large binary categories (video, audio clips, textures).
    #[arg(long)]
    minimal: bool,
}

#[derive(Args)]
struct SortArgs {
    #[arg(value_enum)]
    target: SortTarget,

    #[arg(long)]
    destination: Utf8PathBuf,

    /// Asset manifest; paths inside are relative to the destination.
    #[arg(long)]
    manifest: Utf8PathBuf,
}

#[derive(Args)]
struct CleanArgs {
    #[arg(long)]
    destination: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MigrateError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MigrateError) -> u8 {
    match error {
        MigrateError::MissingConfig
        | MigrateError::ConfigRead(_)
        | MigrateError::ConfigParse(_)
        | MigrateError::DuplicateMapping(_)
        | MigrateError::MissingSourceRoot(_)
        | MigrateError::MissingAssetRoot(_)
        | MigrateError::ManifestParse(_)
        | MigrateError::UnknownType(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate(args) => {
            config.minimal_copy |= args.minimal;
            let store = FsAssetStore::new(args.destination.clone());
            let app = App::new(config, args.destination, store);
            let report = app.migrate(&args.source)?;
            JsonOutput::print_migration(&report).into_diagnostic()
        }
        Commands::Sort(args) => {
            let store = FsAssetStore::open(args.destination.clone(), args.manifest)?;
            let app = App::new(config, args.destination, store);
            let report = app.sort(args.target)?;
            app.store().persist()?;
            JsonOutput::print_folder(&report).into_diagnostic()
        }
        Commands::Unsort(args) => {
            let store = FsAssetStore::open(args.destination.clone(), args.manifest)?;
            let app = App::new(config, args.destination, store);
            let report = app.unsort(args.target)?;
            app.store().persist()?;
            JsonOutput::print_folder(&report).into_diagnostic()
        }
        Commands::Clean(args) => {
            let store = FsAssetStore::new(args.destination.clone());
            let app = App::new(config, args.destination, store);
            let report = app.clean()?;
            JsonOutput::print_clean(&report).into_diagnostic()
        }
    }
}
