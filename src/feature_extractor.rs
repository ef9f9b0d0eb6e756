//! Feature extraction: one engine round-trip per judged document
//!
//! The extractor is a forward-only iterator. Documents the engine cannot
//! produce a feature vector for are logged and skipped; anything that means
//! the engine or the transport is unhealthy ends extraction with an error.
//! The connection is released when the extractor is dropped.

use crate::errors::{LtrError, LtrResult};
use crate::query_generator::EngineQuery;
use crate::solr_connection::SolrConnection;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Document field the feature transformer writes the vector into
pub const FEATURES_FIELD: &str = "[features]";

/// A judged document with its engine-computed features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTuple {
    pub query: String,
    pub doc_id: String,
    pub label: String,
    pub source: String,
    /// `name=value` entries in feature-store declaration order
    pub features: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub queries: usize,
    pub extracted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    docs: Vec<Map<String, Value>>,
}

/// Why a document produced no tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    NoDocuments,
    MissingFeatures,
    NullFeatures,
    EmptyFeatures,
    UnexpectedFeatures,
}

impl Skip {
    fn describe(self) -> &'static str {
        match self {
            Skip::NoDocuments => "no documents returned",
            Skip::MissingFeatures => "document has no feature field",
            Skip::NullFeatures => "null feature vector",
            Skip::EmptyFeatures => "empty feature vector",
            Skip::UnexpectedFeatures => "feature field is not a string",
        }
    }
}

fn feature_vector(docs: &[Map<String, Value>]) -> Result<Vec<String>, Skip> {
    let doc = docs.first().ok_or(Skip::NoDocuments)?;
    match doc.get(FEATURES_FIELD) {
        None => Err(Skip::MissingFeatures),
        Some(Value::Null) => Err(Skip::NullFeatures),
        Some(Value::String(joined)) if joined.is_empty() => Err(Skip::EmptyFeatures),
        Some(Value::String(joined)) => Ok(joined.split(',').map(str::to_string).collect()),
        Some(_) => Err(Skip::UnexpectedFeatures),
    }
}

pub struct FeatureExtractor<I> {
    queries: I,
    connection: SolrConnection,
    stats: ExtractionStats,
    last_body: Option<String>,
    finished: bool,
    aborted: bool,
}

impl<I> FeatureExtractor<I>
where
    I: Iterator<Item = LtrResult<EngineQuery>>,
{
    pub fn new(queries: I, connection: SolrConnection) -> Self {
        Self {
            queries,
            connection,
            stats: ExtractionStats::default(),
            last_body: None,
            finished: false,
            aborted: false,
        }
    }

    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    /// Whether extraction ended on an error rather than running out of queries
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    fn extract(&mut self, query: &EngineQuery) -> LtrResult<Option<Vec<String>>> {
        let path = query
            .path_and_query
            .split('?')
            .next()
            .unwrap_or(&query.path_and_query);
        let operation = format!("GET {path}");

        let response = self.connection.get(&query.path_and_query)?;
        self.last_body = Some(response.body.clone());
        let response = response.accept(&operation, &[StatusCode::OK])?;

        let parsed: SelectResponse = serde_json::from_str(&response.body).map_err(|e| {
            LtrError::serialization(
                format!("response to {operation} for document {}", query.judgment.doc_id),
                e,
            )
        })?;

        match feature_vector(&parsed.response.docs) {
            Ok(features) => Ok(Some(features)),
            Err(skip) => {
                warn!(
                    doc_id = %query.judgment.doc_id,
                    reason = skip.describe(),
                    body = %response.body,
                    "no feature vector for document"
                );
                Ok(None)
            }
        }
    }

    fn fail(&mut self, err: LtrError) -> LtrResult<FeatureTuple> {
        self.finished = true;
        self.aborted = true;
        error!(
            last_response = self.last_body.as_deref().unwrap_or(""),
            error = %err,
            "feature extraction aborted"
        );
        Err(err)
    }
}

impl<I> Iterator for FeatureExtractor<I>
where
    I: Iterator<Item = LtrResult<EngineQuery>>,
{
    type Item = LtrResult<FeatureTuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let query = match self.queries.next() {
                Some(Ok(query)) => query,
                Some(Err(e)) => return Some(self.fail(e)),
                None => {
                    self.finished = true;
                    return None;
                }
            };
            self.stats.queries += 1;

            match self.extract(&query) {
                Ok(Some(features)) => {
                    self.stats.extracted += 1;
                    let judgment = query.judgment;
                    return Some(Ok(FeatureTuple {
                        query: judgment.query,
                        doc_id: judgment.doc_id,
                        label: judgment.label,
                        source: judgment.source,
                        features,
                    }));
                }
                Ok(None) => self.stats.skipped += 1,
                Err(e) => return Some(self.fail(e)),
            }
        }
    }
}

/// Open a connection and extract features for each query lazily.
pub fn generate_training_data<Q>(
    queries: Q,
    host: &str,
    port: u16,
) -> LtrResult<FeatureExtractor<Q::IntoIter>>
where
    Q: IntoIterator<Item = LtrResult<EngineQuery>>,
{
    let connection = SolrConnection::open(host, port)?;
    Ok(FeatureExtractor::new(queries.into_iter(), connection))
}
