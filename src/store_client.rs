//! Replace semantics for named feature stores and models on the engine
//!
//! Both resources follow the same lifecycle: delete whatever currently lives
//! under the name (a missing resource is fine), then create it from a JSON
//! document on disk. A run's store or model replaces the previous one
//! entirely; nothing is merged.

use crate::errors::{LtrError, LtrResult};
use crate::solr_connection::SolrConnection;
use reqwest::StatusCode;
use std::fs;
use std::path::Path;
use tracing::info;

const DELETE_ACCEPTED: &[StatusCode] = &[
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::NOT_FOUND,
];
const FEATURE_STORE_CREATE_ACCEPTED: &[StatusCode] = &[StatusCode::OK, StatusCode::ACCEPTED];
const MODEL_STORE_CREATE_ACCEPTED: &[StatusCode] =
    &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

pub fn feature_store_endpoint(collection: &str) -> String {
    format!("/solr/{collection}/schema/feature-store")
}

pub fn model_store_endpoint(collection: &str) -> String {
    format!("/solr/{collection}/schema/model-store")
}

/// Read a JSON document, refusing to send anything that does not parse.
fn read_json_document(path: &Path, what: &str) -> LtrResult<Vec<u8>> {
    let body = fs::read(path)
        .map_err(|e| LtrError::io(format!("reading {what} {}", path.display()), e))?;
    serde_json::from_slice::<serde_json::Value>(&body).map_err(|e| {
        LtrError::serialization(format!("{what} {} is not valid JSON", path.display()), e)
    })?;
    Ok(body)
}

/// Client for the feature-store and model-store endpoints of one engine node.
#[derive(Debug, Clone)]
pub struct StoreClient {
    host: String,
    port: u16,
}

impl StoreClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn replace(
        &self,
        endpoint: &str,
        name: &str,
        document: Vec<u8>,
        create_accepted: &[StatusCode],
    ) -> LtrResult<()> {
        let conn = SolrConnection::open(&self.host, self.port)?;

        let delete_path = format!("{endpoint}/{name}");
        let deleted = conn
            .delete(&delete_path)?
            .accept(&format!("DELETE {delete_path}"), DELETE_ACCEPTED)?;
        if deleted.status == StatusCode::NOT_FOUND {
            info!(endpoint, name, "nothing to replace");
        }

        conn.post_json(endpoint, document)?
            .accept(&format!("POST {endpoint}"), create_accepted)?;
        Ok(())
    }

    /// Replace the named feature store with the definitions in `features_file`.
    pub fn setup_feature_store(
        &self,
        collection: &str,
        features_file: &Path,
        store_name: &str,
    ) -> LtrResult<()> {
        let document = read_json_document(features_file, "features file")?;
        info!(
            collection,
            store = store_name,
            features_file = %features_file.display(),
            "uploading feature store"
        );
        self.replace(
            &feature_store_endpoint(collection),
            store_name,
            document,
            FEATURE_STORE_CREATE_ACCEPTED,
        )
    }

    /// Replace the named model with the serving model in `model_file`.
    pub fn upload_model(
        &self,
        collection: &str,
        model_file: &Path,
        model_name: &str,
    ) -> LtrResult<()> {
        let document = read_json_document(model_file, "model file")?;
        info!(
            collection,
            model = model_name,
            model_file = %model_file.display(),
            "uploading model"
        );
        self.replace(
            &model_store_endpoint(collection),
            model_name,
            document,
            MODEL_STORE_CREATE_ACCEPTED,
        )
    }
}

pub fn setup_feature_store(
    collection: &str,
    host: &str,
    port: u16,
    features_file: impl AsRef<Path>,
    store_name: &str,
) -> LtrResult<()> {
    StoreClient::new(host, port).setup_feature_store(collection, features_file.as_ref(), store_name)
}

pub fn upload_model(
    collection: &str,
    host: &str,
    port: u16,
    model_file: impl AsRef<Path>,
    model_name: &str,
) -> LtrResult<()> {
    StoreClient::new(host, port).upload_model(collection, model_file.as_ref(), model_name)
}
