//! Command line definition for `hotel-import`

use crate::config::{BatchFailurePolicy, ImportConfig};
use clap::{Args, Parser, Subcommand};
use hotel_common::Result;
use std::path::PathBuf;

/// Import hotel and review exports into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "hotel-import")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide the progress spinner
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import hotels from a tab separated file
    Hotels(ImportArgs),

    /// Import reviews from a comma separated file (hotels must be imported first)
    Reviews(ImportArgs),

    /// Create or upgrade the database schema
    Migrate,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Input file
    pub path: PathBuf,

    /// Rows per batch
    #[arg(long, env = "IMPORT_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Batches that may wait for the writer before reading pauses
    #[arg(long, env = "IMPORT_MAX_PENDING_BATCHES")]
    pub max_pending_batches: Option<usize>,

    /// What to do when a batch fails to commit
    #[arg(long, value_enum, ignore_case = true, env = "IMPORT_ON_BATCH_FAILURE")]
    pub on_batch_failure: Option<BatchFailurePolicy>,

    /// Validate and count rows against an in-memory store; the database is not touched
    #[arg(long)]
    pub dry_run: bool,

    /// Do not apply migrations before importing
    #[arg(long)]
    pub skip_migrations: bool,

    /// Write the import report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl ImportArgs {
    /// Apply flag overrides on top of `base` and validate the result.
    pub fn import_config(&self, base: ImportConfig) -> Result<ImportConfig> {
        let mut config = base;
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(pending) = self.max_pending_batches {
            config.max_pending_batches = pending;
        }
        if let Some(policy) = self.on_batch_failure {
            config.on_batch_failure = policy;
        }
        config.validate()?;
        Ok(config)
    }
}
