//! CLI for reconstructing documents from a table dump

use anyhow::Context;
use clap::{Parser, Subcommand};
use filedata::chunked::{load_dump, Cursor, DocumentReader};
use filedata::common::{display_id, encode_key, format_bytes};
use filedata::Config;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "filedata")]
#[command(about = "Reassemble chunked documents from a key-value table dump")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON-lines dump of the document table
    #[arg(long)]
    dump: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write document content to stdout
    Cat {
        /// Only this document (all if omitted)
        #[arg(long)]
        document: Option<String>,
    },

    /// Write every document to its own file
    Extract {
        /// Output directory (overrides the configured one)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the access labels of every document
    Labels,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // stdout carries document bytes, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let records = load_dump(&cli.dump)
        .with_context(|| format!("failed to load dump {:?}", cli.dump))?;
    tracing::info!("Loaded {} records from {:?}", records.len(), cli.dump);
    let mut reader = DocumentReader::new(Cursor::new(records));

    let buffer_size = config.read_buffer_size;
    let fail_fast = config.fail_fast;
    let report = match cli.command {
        Commands::Cat { document } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let report = reader.for_each(buffer_size, fail_fast, |header, content, _| {
                let wanted = document
                    .as_deref()
                    .map_or(true, |id| id.as_bytes() == header.document_id.as_ref());
                if wanted {
                    out.write_all(content)?;
                }
                Ok(())
            })?;
            out.flush()?;
            report
        }

        Commands::Extract { output } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            fs::create_dir_all(&output)?;
            reader.for_each(buffer_size, fail_fast, |header, content, summary| {
                let path = output.join(encode_key(&display_id(&header.document_id)));
                fs::write(&path, content)?;
                tracing::info!(
                    "{} -> {:?} ({}, labels [{}])",
                    display_id(&header.document_id),
                    path,
                    format_bytes(summary.bytes),
                    summary.labels.join(", ")
                );
                Ok(())
            })?
        }

        Commands::Labels => reader.for_each(buffer_size, fail_fast, |header, _, summary| {
            println!(
                "{}\t{}",
                display_id(&header.document_id),
                summary.labels.join(",")
            );
            Ok(())
        })?,
    };

    tracing::info!(
        "Documents: {} ({} corrupt skipped), bytes: {}",
        report.documents,
        report.corrupt,
        format_bytes(report.bytes)
    );
    Ok(())
}
