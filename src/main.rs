//! CLI entry point for the beatmap fetcher.

use std::sync::Arc;

use anyhow::{Context, Result};
use beatmap_fetch::{
    DownloadEngine, HttpTransport, LocalLibrary, ProgressDisplay, RunReport,
    read_identifier_file,
};
use clap::Parser;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{Settings, load_file_config};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();

    debug!(?args, "CLI arguments parsed");

    let (config_path, file_config) = load_file_config(args.config.as_deref())?;
    if let Some(path) = &config_path {
        debug!(path = %path.display(), "loaded config file");
    }
    let settings = Settings::resolve(&args, file_config)?;

    let identifiers = read_identifier_file(&settings.input)
        .await
        .with_context(|| format!("Failed to read input file '{}'", settings.input.display()))?;
    if identifiers.is_empty() {
        info!(input = %settings.input.display(), "no beatmap ids found in input");
        return Ok(());
    }
    info!(count = identifiers.len(), "read beatmap ids");

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;

    let (pending, skipped) = if settings.skip_existing {
        let library = LocalLibrary::scan(&settings.output_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to scan output directory '{}'",
                    settings.output_dir.display()
                )
            })?;
        library.partition(identifiers)
    } else {
        (identifiers, Vec::new())
    };
    if !skipped.is_empty() {
        info!(skipped = skipped.len(), "skipping beatmaps already present");
    }

    let mut builder = HttpTransport::builder();
    if let Some(timeout) = settings.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(timeout) = settings.read_timeout {
        builder = builder.read_timeout(timeout);
    }
    if let Some(user_agent) = settings.user_agent.clone() {
        builder = builder.user_agent(user_agent);
    }
    if settings.progress {
        builder = builder.progress(ProgressDisplay::new());
    }
    let transport = builder.build().context("Failed to build HTTP client")?;

    info!(
        template = %settings.fetch.url_template(),
        dest = %settings.output_dir.display(),
        "downloading beatmaps"
    );
    let engine = DownloadEngine::new(Arc::new(transport), settings.fetch.clone())
        .context("Failed to create download engine")?;
    let batch = engine
        .run(&pending, &settings.output_dir)
        .await
        .context("Download batch aborted")?;

    info!(
        completed = batch.completed(),
        failed = batch.failed(),
        retried = batch.retried(),
        skipped = skipped.len(),
        total = batch.total() + skipped.len(),
        "Download complete"
    );
    for identifier in batch.failed_identifiers() {
        warn!(id = %identifier, "beatmap could not be downloaded");
    }

    if let Some(path) = &settings.report {
        RunReport::new(&settings.output_dir, &batch, &skipped)
            .write_to(path)
            .await
            .with_context(|| format!("Failed to write run report '{}'", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(())
}
