//! Build automation tasks for the hotel import workspace
//!
//! - `generate-cli-docs`: render the `hotel-import` command reference

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for hotel-import", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference as Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<hotel_ingest::Cli>();

    let content = format!(
        r#"# hotel-import CLI Reference

Generated from the CLI definition on {}.

## Overview

`hotel-import` loads a tab separated hotel export and a comma separated review
export into PostgreSQL. Import hotels first: reviews are matched to hotels by
name.

```bash
hotel-import migrate
hotel-import hotels data/hotels.tsv --report hotels-report.json
hotel-import reviews data/reviews.csv --on-batch-failure continue
```

Rows that fail validation or reference an unknown city, region or hotel are
skipped and counted by reason in the final summary.

## Commands

{}

## Environment Variables

| Variable | Default |
|---|---|
| `DATABASE_URL` | built from `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD` |
| `DB_HOST` / `DB_PORT` | `localhost` / `5432` |
| `DB_NAME` / `DB_USER` / `DB_PASSWORD` | `hotel_db` / `postgres` / `password` |
| `DB_MAX_CONNECTIONS` / `DB_MIN_CONNECTIONS` | `5` / `0` |
| `DB_ACQUIRE_TIMEOUT` / `DB_IDLE_TIMEOUT` | `30` / `10` seconds |
| `IMPORT_BATCH_SIZE` | `1000` |
| `IMPORT_MAX_PENDING_BATCHES` | `4` |
| `IMPORT_ON_BATCH_FAILURE` | `abort` |
| `IMPORT_PROGRESS_INTERVAL` | `1000` |
| `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`, `LOG_FILTER` | `info`, `console`, `text`, `./logs`, `hotel-import`, none |

A `.env` file in the working directory is loaded first.

## Exit Codes

- `0`: import finished (skipped rows do not change the exit code)
- `1`: the import failed (missing file, configuration, database or batch error)
- `2`: invalid command line

---

*Regenerate with `cargo run -p xtask -- generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
