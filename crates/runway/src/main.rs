mod prompter;

use clap::Parser;
use colored::Colorize;
use prompter::InquirePrompter;
use runway_core::{Context, Pipeline, RunOptions};
use runway_gcloud::{Gcloud, ProcessRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runway", version)]
#[command(
    about = "Provision Google Cloud for a Cloud Run backend, one question at a time",
    long_about = None
)]
struct Cli {
    /// The cli is already authenticated, use the active configuration
    #[arg(long)]
    skip_auth: bool,

    /// Settings file (defaults to runway.yaml or ~/.config/runway/config.yaml)
    #[arg(short, long, env = "RUNWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Region override
    #[arg(long)]
    region: Option<String>,

    /// Zone override
    #[arg(long)]
    zone: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

const CRATES: &[&str] = &["runway", "runway_core", "runway_gcloud", "runway_config"];

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = std::iter::once("warn".to_string())
        .chain(CRATES.iter().map(|krate| format!("{}={}", krate, level)))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries the report only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (mut settings, source) = runway_config::load(cli.config.as_deref())?;
    if let Some(path) = &source {
        tracing::info!("Using settings from {}", path.display());
    }
    if let Some(region) = cli.region {
        settings.region = region;
    }
    if let Some(zone) = cli.zone {
        settings.zone = zone;
    }

    let workdir = std::env::current_dir()?;
    let ctx = Context::new(
        Gcloud::new(Arc::new(ProcessRunner::new())),
        Box::new(InquirePrompter),
        settings,
        workdir,
    );

    let pipeline = Pipeline::new(
        ctx,
        RunOptions {
            skip_auth: cli.skip_auth,
        },
    );
    let outcome = pipeline.run().await?;

    println!();
    print!("{}", outcome.report.render());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
