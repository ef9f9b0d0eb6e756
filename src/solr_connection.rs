// solr_connection.rs - Scoped HTTP connection to a Solr node

use crate::errors::{LtrError, LtrResult};
use reqwest::blocking::Client;
use reqwest::header::{CONNECTION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

/// Fully read engine response.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: StatusCode,
    pub body: String,
}

impl EngineResponse {
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Keep the response if its status is one of `accepted`, otherwise
    /// turn it into a transport error carrying status, reason and body.
    pub fn accept(self, operation: &str, accepted: &[StatusCode]) -> LtrResult<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            Err(LtrError::transport(
                operation,
                self.status.as_u16(),
                self.reason(),
                self.body,
            ))
        }
    }
}

/// Connection to one engine node. Released when dropped.
pub struct SolrConnection {
    client: Client,
    base_url: String,
}

impl SolrConnection {
    pub fn open(host: &str, port: u16) -> LtrResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LtrError::network("opening connection", e))?;
        let base_url = format!("http://{host}:{port}");
        debug!(base_url = %base_url, "connection opened");
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// GET with a keep-alive header, as issued once per judged document
    pub fn get(&self, path_and_query: &str) -> LtrResult<EngineResponse> {
        let request = self
            .client
            .get(self.url(path_and_query))
            .header(CONNECTION, "keep-alive");
        Self::execute("GET", path_and_query, request)
    }

    pub fn delete(&self, path: &str) -> LtrResult<EngineResponse> {
        Self::execute("DELETE", path, self.client.delete(self.url(path)))
    }

    pub fn post_json(&self, path: &str, body: Vec<u8>) -> LtrResult<EngineResponse> {
        let request = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        Self::execute("POST", path, request)
    }

    fn execute(
        method: &str,
        path: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> LtrResult<EngineResponse> {
        let operation = format!("{method} {path}");
        let response = request
            .send()
            .map_err(|e| LtrError::network(operation.clone(), e))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| LtrError::network(operation.clone(), e))?;
        debug!(method, path, status = status.as_u16(), "engine responded");
        Ok(EngineResponse { status, body })
    }
}

impl Drop for SolrConnection {
    fn drop(&mut self) {
        debug!(base_url = %self.base_url, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_status_passes_through() {
        let response = EngineResponse {
            status: StatusCode::NOT_FOUND,
            body: "{}".into(),
        };
        let kept = response
            .accept("DELETE x", &[StatusCode::OK, StatusCode::NOT_FOUND])
            .unwrap();
        assert_eq!(kept.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejected_status_becomes_transport_error() {
        let response = EngineResponse {
            status: StatusCode::BAD_REQUEST,
            body: "bad feature".into(),
        };
        let err = response.accept("POST x", &[StatusCode::OK]).unwrap_err();
        match err {
            LtrError::Transport {
                status,
                reason,
                body,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(reason, "Bad Request");
                assert_eq!(body, "bad feature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn open_builds_base_url() {
        let conn = SolrConnection::open("localhost", 8983).unwrap();
        assert_eq!(conn.base_url(), "http://localhost:8983");
    }
}
