// config.rs
// Purpose: Run configuration for the LTR training pipeline, read once at start-up

use crate::errors::{LtrError, LtrResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model class Solr instantiates for the uploaded serving model
pub const DEFAULT_MODEL_CLASS: &str = "org.apache.solr.ltr.ranking.RankSVMModel";

/// Layout of the training file handed to the external trainer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingFormat {
    /// One line per judged document: `label qid:N id:value ...`.
    /// For `qid`-aware ranking trainers such as SVMrank. LIBLINEAR's `train`
    /// rejects the `qid` token, and the model converter only reads LIBLINEAR
    /// output, so a full run with this layout needs a LIBLINEAR-format model.
    #[default]
    Grouped,
    /// RankSVM pair differences within each query group: `+1|-1 id:value ...`.
    /// Plain binary LIBSVM input, the layout LIBLINEAR's `train` expects.
    Pairwise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub collection: String,
    pub request_handler: String,
    pub feature_store_name: String,
    #[serde(default)]
    pub efi_params: String,
    pub host: String,
    pub port: u16,
    pub features_file: PathBuf,
    pub user_queries_file: PathBuf,
    pub training_file: PathBuf,
    pub training_library_location: PathBuf,
    #[serde(default)]
    pub training_library_options: String,
    pub trained_model_file: PathBuf,
    pub solr_model_file: PathBuf,
    pub solr_model_name: String,
    #[serde(default = "default_model_class")]
    pub solr_model_class: String,
    #[serde(default)]
    pub training_format: TrainingFormat,
}

fn default_model_class() -> String {
    DEFAULT_MODEL_CLASS.to_string()
}

impl PipelineConfig {
    /// Reject configurations that cannot produce valid engine URLs
    pub fn validate(&self) -> LtrResult<()> {
        let required = [
            ("collection", &self.collection),
            ("requestHandler", &self.request_handler),
            ("featureStoreName", &self.feature_store_name),
            ("host", &self.host),
            ("solrModelName", &self.solr_model_name),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(LtrError::config(format!("{key} cannot be empty")));
            }
        }

        if self.port == 0 {
            return Err(LtrError::config("port must be non-zero"));
        }

        for (key, name) in [
            ("collection", &self.collection),
            ("featureStoreName", &self.feature_store_name),
            ("solrModelName", &self.solr_model_name),
        ] {
            if name.contains('/') {
                return Err(LtrError::config(format!("{key} must not contain '/'")));
            }
        }

        Ok(())
    }

    /// Base URL of the engine, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
