//! hotel-import - load hotel and review exports

use anyhow::{Context, Result};
use clap::Parser;
use hotel_common::logging::{init_logging, LogConfig, LogLevel};
use hotel_common::ImportError;
use hotel_ingest::cli::{Cli, Commands, ImportArgs};
use hotel_ingest::config::{DbConfig, ImportConfig};
use hotel_ingest::db;
use hotel_ingest::hotels::HotelImporter;
use hotel_ingest::progress::RowProgress;
use hotel_ingest::reviews::ReviewImporter;
use hotel_ingest::source::CsvSource;
use hotel_ingest::store::{ImportStore, MemoryStore, PgStore};
use hotel_ingest::{ImportKind, ImportReport};
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let defaults = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("hotel-import")
        .build();

    // LOG_* variables take precedence over flags
    let log_config = match defaults.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid logging settings: {:#}", e);
            defaults
        }
    };
    let guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            None
        }
    };

    let code = match execute(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            1
        }
    };

    drop(guard);
    process::exit(code);
}

async fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Hotels(args) => import(ImportKind::Hotels, args, cli.quiet).await,
        Commands::Reviews(args) => import(ImportKind::Reviews, args, cli.quiet).await,
        Commands::Migrate => {
            let db_config = DbConfig::from_env()?;
            let pool = db::create_pool(&db_config)
                .await
                .context("Failed to connect to database")?;
            db::run_migrations(&pool).await?;
            Ok(())
        }
    }
}

async fn import(kind: ImportKind, args: &ImportArgs, quiet: bool) -> Result<()> {
    // checked before any database work
    if !args.path.is_file() {
        return Err(ImportError::SourceNotFound(args.path.display().to_string()).into());
    }

    let config = args.import_config(ImportConfig::from_env()?)?;
    let progress = if quiet || !std::io::stderr().is_terminal() {
        RowProgress::hidden()
    } else {
        RowProgress::spinner(&format!("Importing {}", kind))
    };

    let report = if args.dry_run {
        info!("Dry run: using in-memory store");
        run_import(Arc::new(MemoryStore::new()), kind, args, config, progress).await?
    } else {
        let db_config = DbConfig::from_env()?;
        let pool = db::create_pool(&db_config)
            .await
            .with_context(|| format!("Failed to connect to database at {}", db_config.target()))?;
        db::health_check(&pool).await?;
        if !args.skip_migrations {
            db::run_migrations(&pool).await?;
        }
        run_import(Arc::new(PgStore::new(pool)), kind, args, config, progress).await?
    };

    report.log_summary();

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

async fn run_import<S: ImportStore>(
    store: Arc<S>,
    kind: ImportKind,
    args: &ImportArgs,
    config: ImportConfig,
    progress: RowProgress,
) -> hotel_common::Result<ImportReport> {
    match kind {
        ImportKind::Hotels => {
            let mut importer =
                HotelImporter::new(store, CsvSource::tsv(args.path.clone()), config)
                    .with_progress(progress);
            info!(run_id = %importer.run_id(), kind = %kind, "Import run created");
            importer.run().await
        }
        ImportKind::Reviews => {
            let mut importer =
                ReviewImporter::new(store, CsvSource::csv(args.path.clone()), config)
                    .with_progress(progress);
            info!(run_id = %importer.run_id(), kind = %kind, "Import run created");
            importer.run().await
        }
    }
}
