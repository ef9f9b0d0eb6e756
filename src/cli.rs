use clap::Parser;
use std::path::PathBuf;

/// Train a learning-to-rank model from relevance judgments and upload it to Solr
#[derive(Parser, Debug)]
#[command(name = "solr_ltr_pipeline", version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration describing the collection, files and trainer
    #[arg(short, long = "config", value_name = "FILE")]
    pub config: PathBuf,
}
