//! Library root for the `solr_ltr_pipeline` crate
//! Learning-to-rank training against Solr: feature extraction, training, model upload

// Core error handling
pub mod errors;

// Configuration & CLI
pub mod cli;
pub mod config;
pub mod config_loader;

// Judgments and feature extraction
pub mod feature_extractor;
pub mod judgments;
pub mod query_generator;

// Engine access
pub mod solr_connection;
pub mod store_client;

// Training and model conversion
pub mod model_converter;
pub mod trainer;
pub mod training_set;

// Orchestration
pub mod pipeline;

pub use config::{PipelineConfig, TrainingFormat};
pub use errors::{LtrError, LtrResult};
pub use pipeline::{run_pipeline, Pipeline, PipelineReport, Stage};
