//! Turns judgments into feature-extraction requests against the engine.

use crate::config::PipelineConfig;
use crate::errors::{LtrError, LtrResult};
use crate::judgments::{Judgment, JudgmentReader};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use url::form_urlencoded;

/// Placeholder after form-encoding; receives the bare encoded user query.
const ENCODED_PLACEHOLDER: &str = "%24USERQUERY";
/// Raw placeholder; receives the quoted, encoded user query.
const RAW_PLACEHOLDER: &str = "$USERQUERY";

/// `application/x-www-form-urlencoded` serialization (space becomes `+`)
pub fn form_encode(input: &str) -> String {
    form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

/// Escape characters the engine's query parser treats specially.
pub fn escape_user_query(query: &str) -> String {
    query.trim().replace('\'', "\\'").replace('/', "\\\\/")
}

/// Request prefix derived once from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    prefix: String,
}

impl QueryTemplate {
    pub fn new(config: &PipelineConfig) -> Self {
        let projection = format!(
            "/solr/{}/{}?fl=id,score,[features store={} {}]&q=",
            config.collection, config.request_handler, config.feature_store_name, config.efi_params
        );
        let mut prefix = projection.replace(' ', "+");
        prefix.push_str(&form_encode("id:"));
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path and query string that extracts features for one judged document.
    pub fn request_for(&self, judgment: &Judgment) -> String {
        let user_query = form_encode(&escape_user_query(&judgment.query));
        let quoted_user_query = form_encode(&format!("\\'{user_query}\\'"));

        let request = format!("{}\"{}\"", self.prefix, form_encode(&judgment.doc_id));
        request
            .replace(ENCODED_PLACEHOLDER, &user_query)
            .replace(RAW_PLACEHOLDER, &quoted_user_query)
    }
}

/// A judgment bound to its feature-extraction request.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub path_and_query: String,
    pub judgment: Judgment,
}

/// Single-pass producer of [`EngineQuery`] values in judgment order.
pub struct QueryGenerator<R> {
    judgments: JudgmentReader<R>,
    template: QueryTemplate,
}

impl<R: BufRead> QueryGenerator<R> {
    pub fn new(reader: R, template: QueryTemplate) -> Self {
        Self {
            judgments: JudgmentReader::new(reader),
            template,
        }
    }
}

impl<R: BufRead> Iterator for QueryGenerator<R> {
    type Item = LtrResult<EngineQuery>;

    fn next(&mut self) -> Option<Self::Item> {
        let judgment = match self.judgments.next()? {
            Ok(judgment) => judgment,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(EngineQuery {
            path_and_query: self.template.request_for(&judgment),
            judgment,
        }))
    }
}

/// Open the judgments file and generate its extraction requests lazily.
pub fn generate_queries(
    user_queries_file: impl AsRef<Path>,
    config: &PipelineConfig,
) -> LtrResult<QueryGenerator<BufReader<File>>> {
    let path = user_queries_file.as_ref();
    let file = File::open(path)
        .map_err(|e| LtrError::io(format!("opening judgments {}", path.display()), e))?;
    Ok(QueryGenerator::new(
        BufReader::new(file),
        QueryTemplate::new(config),
    ))
}
