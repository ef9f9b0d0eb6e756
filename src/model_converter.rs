//! Converts a LIBLINEAR-style trained model into the engine's serving model.
//!
//! The trained model is a header (`solver_type`, `nr_feature`, `bias`, ...)
//! followed by a line containing only `w` and one weight per line. Weight `i`
//! belongs to feature id `i` of the [`FeatureDictionary`] built while the
//! training set was written. A dictionary feature past `nr_feature` never
//! reached the trainer and is given weight 0.

use crate::errors::{LtrError, LtrResult};
use crate::training_set::FeatureDictionary;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const WEIGHTS_MARKER: &str = "w";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFeature {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub weights: Map<String, serde_json::Value>,
}

/// Serving model document accepted by the model-store endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingModel {
    pub class: String,
    pub store: String,
    pub name: String,
    pub features: Vec<ModelFeature>,
    pub params: ModelParams,
}

impl ServingModel {
    pub fn write_to(&self, path: &Path) -> LtrResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LtrError::serialization("serving model", e))?;
        fs::write(path, json)
            .map_err(|e| LtrError::io(format!("writing serving model {}", path.display()), e))
    }
}

/// Weights read from a trained model, in feature-id order.
pub fn parse_weights(model_text: &str) -> LtrResult<Vec<f64>> {
    let mut lines = model_text.lines();
    let mut nr_feature: Option<usize> = None;

    loop {
        let line = lines
            .next()
            .ok_or_else(|| LtrError::model("trained model has no weight section"))?
            .trim();
        if line == WEIGHTS_MARKER {
            break;
        }
        if let Some(value) = line.strip_prefix("nr_feature") {
            nr_feature = Some(value.trim().parse().map_err(|_| {
                LtrError::model(format!("invalid nr_feature header '{line}'"))
            })?);
        }
    }

    let mut weights = Vec::new();
    for line in lines {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let weight = token
            .parse::<f64>()
            .map_err(|_| LtrError::model(format!("weight '{token}' is not a number")))?;
        weights.push(weight);
    }

    // A trailing weight past nr_feature is the bias term.
    if let Some(limit) = nr_feature {
        weights.truncate(limit);
    }
    Ok(weights)
}

pub struct ModelConverter<'a> {
    dictionary: &'a FeatureDictionary,
    model_class: String,
}

impl<'a> ModelConverter<'a> {
    pub fn new(dictionary: &'a FeatureDictionary, model_class: impl Into<String>) -> Self {
        Self {
            dictionary,
            model_class: model_class.into(),
        }
    }

    pub fn convert_text(
        &self,
        model_text: &str,
        model_name: &str,
        store_name: &str,
    ) -> LtrResult<ServingModel> {
        let weights = parse_weights(model_text)?;

        let mut named = Map::new();
        for (index, weight) in weights.iter().enumerate() {
            let id = index + 1;
            let name = self.dictionary.name(id).ok_or_else(|| {
                LtrError::model(format!("weight for feature id {id} has no feature name"))
            })?;
            named.insert(name.to_string(), serde_json::json!(weight));
        }

        // Features the trainer never saw (constant within every group) get no weight.
        let unweighted: Vec<&str> = self
            .dictionary
            .names()
            .filter(|name| !named.contains_key(*name))
            .collect();
        if !unweighted.is_empty() {
            warn!(
                model = model_name,
                features = ?unweighted,
                "features absent from the trained model, weighting them 0"
            );
            for name in unweighted {
                named.insert(name.to_string(), serde_json::json!(0.0));
            }
        }

        Ok(ServingModel {
            class: self.model_class.clone(),
            store: store_name.to_string(),
            name: model_name.to_string(),
            features: self
                .dictionary
                .names()
                .map(|name| ModelFeature {
                    name: name.to_string(),
                })
                .collect(),
            params: ModelParams { weights: named },
        })
    }

    /// Read the trainer's output and write the serving model document.
    pub fn convert(
        &self,
        trained_model_file: &Path,
        serving_model_file: &Path,
        model_name: &str,
        store_name: &str,
    ) -> LtrResult<ServingModel> {
        let text = fs::read_to_string(trained_model_file).map_err(|e| {
            LtrError::io(
                format!("reading trained model {}", trained_model_file.display()),
                e,
            )
        })?;
        let model = self.convert_text(&text, model_name, store_name)?;
        model.write_to(serving_model_file)?;

        info!(
            model = model_name,
            store = store_name,
            features = model.features.len(),
            path = %serving_model_file.display(),
            "serving model written"
        );
        Ok(model)
    }
}
