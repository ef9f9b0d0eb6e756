// solr_ltr_pipeline - main.rs
// Loads the run configuration and drives one training run end to end.

use anyhow::Context;
use clap::Parser;
use solr_ltr_pipeline::cli::Cli;
use solr_ltr_pipeline::config_loader::load_config;
use solr_ltr_pipeline::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;

    let report = Pipeline::new(config)
        .run()
        .context("training pipeline failed")?;

    tracing::info!(
        judgments = report.judgments,
        extracted = report.extraction.extracted,
        skipped = report.extraction.skipped,
        training_records = report.training_records,
        features = report.features,
        sha256 = %report.serving_model_sha256,
        completed_at = %report.completed_at,
        "model trained and uploaded"
    );
    Ok(())
}
