//! cs2cdn binary entry point.
//!
//! Thin wrapper around the cs2cdn library that:
//! 1. Initializes logging
//! 2. Parses and validates configuration
//! 3. Runs the selected action (the full pipeline by default)

use anyhow::{Context, Result};
use cs2cdn::{Cli, Command, Pipeline, RunOutcome, provisioner};
use cs2cdn_tools::ProcessRunner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::from_args();
    let config = cli.config;
    config.validate()?;

    tracing::info!(
        "Configuration loaded: app={}, depot={}, data={}, output={}",
        config.app_id,
        config.depot_id,
        config.data_dir.display(),
        config.output_dir.display()
    );

    match cli.command.unwrap_or_default() {
        Command::Run { force } => {
            let pipeline = Pipeline::from_config(config, ProcessRunner::new())?;
            match pipeline.run(force).await? {
                RunOutcome::UpToDate { id } => {
                    tracing::info!("Manifest {id} already processed, nothing to do");
                }
                RunOutcome::NoMatchingSegments { id } => {
                    tracing::warn!("Manifest {id} has no segments under the image prefix");
                }
                RunOutcome::Published {
                    id,
                    segments,
                    published,
                } => {
                    tracing::info!(
                        "Manifest {id}: downloaded {segments} segments, published {published} images"
                    );
                }
            }
        }
        Command::Resolve { listing, out } => {
            let segments = cs2cdn_vpk::resolve_listing(
                &listing,
                &config.image_prefix,
                &config.archive_dir,
                &config.segment_template(),
                &out,
            )
            .with_context(|| format!("resolving {}", listing.display()))?;

            tracing::info!("Wrote {} segment paths to {}", segments.len(), out.display());
        }
        Command::Provision => {
            provisioner(&config)?.ensure_tools().await?;
            tracing::info!("All dependencies are satisfied.");
        }
    }

    Ok(())
}
