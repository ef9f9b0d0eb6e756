//! pipeline.rs
//! Linear orchestration of one training run, from judgments to an uploaded model.
//! The first failing stage ends the run; completed side effects are not rolled back.

use crate::config::PipelineConfig;
use crate::errors::{LtrError, LtrResult};
use crate::feature_extractor::{generate_training_data, ExtractionStats};
use crate::judgments;
use crate::model_converter::ModelConverter;
use crate::query_generator::generate_queries;
use crate::store_client::StoreClient;
use crate::trainer::TrainerInvocation;
use crate::training_set::{TrainingSetFormatter, TrainingSetSummary};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateJudgments,
    ConfigureFeatureStore,
    GenerateQueries,
    ExtractFeatures,
    FormatTrainingSet,
    InvokeTrainer,
    ConvertModel,
    UploadModel,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::ValidateJudgments,
        Stage::ConfigureFeatureStore,
        Stage::GenerateQueries,
        Stage::ExtractFeatures,
        Stage::FormatTrainingSet,
        Stage::InvokeTrainer,
        Stage::ConvertModel,
        Stage::UploadModel,
        Stage::Done,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ValidateJudgments => "ValidateJudgments",
            Stage::ConfigureFeatureStore => "ConfigureFeatureStore",
            Stage::GenerateQueries => "GenerateQueries",
            Stage::ExtractFeatures => "ExtractFeatures",
            Stage::FormatTrainingSet => "FormatTrainingSet",
            Stage::InvokeTrainer => "InvokeTrainer",
            Stage::ConvertModel => "ConvertModel",
            Stage::UploadModel => "UploadModel",
            Stage::Done => "Done",
        }
    }

    pub fn next(self) -> Option<Stage> {
        let index = Self::ORDER.iter().position(|stage| *stage == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub judgments: usize,
    pub extraction: ExtractionStats,
    pub training_records: usize,
    pub query_groups: usize,
    pub features: usize,
    pub serving_model_sha256: String,
    pub completed_at: DateTime<Utc>,
}

fn sha256_file(path: &Path) -> LtrResult<String> {
    let data = fs::read(path)
        .map_err(|e| LtrError::io(format!("hashing {}", path.display()), e))?;
    Ok(format!("{:x}", Sha256::digest(&data)))
}

pub struct Pipeline {
    config: PipelineConfig,
    store_client: StoreClient,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let store_client = StoreClient::new(config.host.clone(), config.port);
        Self {
            config,
            store_client,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn enter(stage: Stage) {
        info!(stage = %stage, "stage started");
    }

    fn abort(stage: Stage, err: LtrError) -> LtrError {
        error!(stage = %stage, error = %err, "stage failed, aborting run");
        LtrError::stage(stage.name(), err)
    }

    fn run_stage<T>(stage: Stage, action: impl FnOnce() -> LtrResult<T>) -> LtrResult<T> {
        Self::enter(stage);
        action().map_err(|e| Self::abort(stage, e))
    }

    pub fn run(&self) -> LtrResult<PipelineReport> {
        let cfg = &self.config;
        info!(
            engine = %cfg.base_url(),
            collection = %cfg.collection,
            model = %cfg.solr_model_name,
            "training run started"
        );

        let judgments = Self::run_stage(Stage::ValidateJudgments, || {
            judgments::validate_file(&cfg.user_queries_file)
        })?;
        info!(judgments, path = %cfg.user_queries_file.display(), "judgments validated");

        Self::run_stage(Stage::ConfigureFeatureStore, || {
            self.store_client.setup_feature_store(
                &cfg.collection,
                &cfg.features_file,
                &cfg.feature_store_name,
            )
        })?;

        let queries = Self::run_stage(Stage::GenerateQueries, || {
            generate_queries(&cfg.user_queries_file, cfg)
        })?;

        let mut extractor = Self::run_stage(Stage::ExtractFeatures, || {
            generate_training_data(queries, &cfg.host, cfg.port)
        })?;

        // Extraction and formatting run as one streaming pass.
        Self::enter(Stage::FormatTrainingSet);
        let formatted = TrainingSetFormatter::new(cfg.training_format)
            .write(extractor.by_ref(), &cfg.training_file);
        let extraction = extractor.stats();
        let aborted = extractor.aborted();
        drop(extractor);

        let summary: TrainingSetSummary = formatted.map_err(|e| {
            let stage = if aborted {
                Stage::ExtractFeatures
            } else {
                Stage::FormatTrainingSet
            };
            Self::abort(stage, e)
        })?;
        info!(
            queries = extraction.queries,
            extracted = extraction.extracted,
            skipped = extraction.skipped,
            "feature extraction finished"
        );

        Self::run_stage(Stage::InvokeTrainer, || {
            TrainerInvocation::new(
                &cfg.training_library_location,
                cfg.training_library_options.clone(),
                &cfg.training_file,
                &cfg.trained_model_file,
            )
            .run()
            .map(|_| ())
        })?;

        Self::run_stage(Stage::ConvertModel, || {
            ModelConverter::new(&summary.dictionary, cfg.solr_model_class.clone()).convert(
                &cfg.trained_model_file,
                &cfg.solr_model_file,
                &cfg.solr_model_name,
                &cfg.feature_store_name,
            )
        })?;

        let serving_model_sha256 = Self::run_stage(Stage::UploadModel, || {
            self.store_client.upload_model(
                &cfg.collection,
                &cfg.solr_model_file,
                &cfg.solr_model_name,
            )?;
            sha256_file(&cfg.solr_model_file)
        })?;

        let report = PipelineReport {
            judgments,
            extraction,
            training_records: summary.records,
            query_groups: summary.query_groups,
            features: summary.dictionary.len(),
            serving_model_sha256,
            completed_at: Utc::now(),
        };
        info!(
            stage = %Stage::Done,
            model = %cfg.solr_model_name,
            sha256 = %report.serving_model_sha256,
            "pipeline complete"
        );
        Ok(report)
    }
}

/// Run the whole pipeline for one configuration.
pub fn run_pipeline(config: PipelineConfig) -> LtrResult<PipelineReport> {
    Pipeline::new(config).run()
}
