//! In-process stand-in for the Solr endpoints the pipeline talks to.
//!
//! Runs an axum server on its own tokio runtime thread so the blocking
//! client under test can call it from ordinary `#[test]` functions.
#![allow(dead_code)]

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::Router;
use serde_json::{json, Value};
use solr_ltr_pipeline::PipelineConfig;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
    pub status: u16,
}

#[derive(Debug, Default, Clone)]
pub struct MockBehavior {
    /// doc id -> `[features]` value (`None` is a JSON null); unknown ids match no documents
    pub features: HashMap<String, Option<String>>,
    /// Fixed (status, body) for every query request
    pub query_response: Option<(u16, String)>,
    /// Fixed status for every DELETE
    pub delete_status: Option<u16>,
    /// Fixed status for feature-store uploads
    pub feature_store_post_status: Option<u16>,
}

impl MockBehavior {
    pub fn with_features(docs: &[(&str, Option<&str>)]) -> Self {
        Self {
            features: docs
                .iter()
                .map(|(id, features)| (id.to_string(), features.map(str::to_string)))
                .collect(),
            ..Self::default()
        }
    }
}

struct MockState {
    behavior: MockBehavior,
    requests: Mutex<Vec<RecordedRequest>>,
    feature_stores: Mutex<HashMap<String, Vec<Value>>>,
    models: Mutex<HashMap<String, Value>>,
}

pub struct MockSolr {
    pub port: u16,
    state: Arc<MockState>,
}

impl MockSolr {
    pub fn start(behavior: MockBehavior) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock solr");
        let port = listener.local_addr().expect("mock solr address").port();
        listener.set_nonblocking(true).expect("non-blocking listener");

        let state = Arc::new(MockState {
            behavior,
            requests: Mutex::new(Vec::new()),
            feature_stores: Mutex::new(HashMap::new()),
            models: Mutex::new(HashMap::new()),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock solr runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("mock solr server");
            });
        });

        Self { port, state }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_with(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn feature_store(&self, name: &str) -> Option<Vec<Value>> {
        self.state.feature_stores.lock().unwrap().get(name).cloned()
    }

    pub fn model(&self, name: &str) -> Option<Value> {
        self.state.models.lock().unwrap().get(name).cloned()
    }
}

fn ok_body() -> String {
    json!({ "responseHeader": { "status": 0, "QTime": 1 } }).to_string()
}

fn error_body(code: u16, msg: &str) -> String {
    json!({ "responseHeader": { "status": code }, "error": { "msg": msg, "code": code } })
        .to_string()
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("valid status code")
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    let (code, response) = respond(&state, &method, &uri, &body);

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path,
        query: uri.query().map(str::to_string),
        body,
        status: code,
    });
    (status(code), response)
}

fn respond(state: &MockState, method: &Method, uri: &Uri, body: &str) -> (u16, String) {
    let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
    let behavior = &state.behavior;

    match (method.as_str(), segments.as_slice()) {
        ("DELETE", ["solr", _, "schema", "feature-store", name]) => {
            if let Some(code) = behavior.delete_status {
                return (code, error_body(code, "delete refused"));
            }
            match state.feature_stores.lock().unwrap().remove(*name) {
                Some(_) => (200, ok_body()),
                None => (404, error_body(404, &format!("no such feature store {name}"))),
            }
        }
        ("POST", ["solr", _, "schema", "feature-store"]) => {
            if let Some(code) = behavior.feature_store_post_status {
                return (code, error_body(code, "feature store rejected"));
            }
            let features: Vec<Value> = match serde_json::from_str(body) {
                Ok(Value::Array(items)) => items,
                Ok(item) => vec![item],
                Err(_) => return (400, error_body(400, "invalid json")),
            };
            let mut stores = state.feature_stores.lock().unwrap();
            for feature in features {
                let store = feature
                    .get("store")
                    .and_then(Value::as_str)
                    .unwrap_or("_DEFAULT_")
                    .to_string();
                stores.entry(store).or_default().push(feature);
            }
            (200, ok_body())
        }
        ("DELETE", ["solr", _, "schema", "model-store", name]) => {
            if let Some(code) = behavior.delete_status {
                return (code, error_body(code, "delete refused"));
            }
            match state.models.lock().unwrap().remove(*name) {
                Some(_) => (200, ok_body()),
                None => (404, error_body(404, &format!("no such model {name}"))),
            }
        }
        ("POST", ["solr", _, "schema", "model-store"]) => {
            let model: Value = match serde_json::from_str(body) {
                Ok(model) => model,
                Err(_) => return (400, error_body(400, "invalid json")),
            };
            let name = model
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            state.models.lock().unwrap().insert(name, model);
            (200, ok_body())
        }
        ("GET", ["solr", _, _handler]) => {
            if let Some((code, body)) = &behavior.query_response {
                return (*code, body.clone());
            }
            let q = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
                .find(|(key, _)| key == "q")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            let doc_id = q.trim_start_matches("id:").trim_matches('"');

            let docs = match behavior.features.get(doc_id) {
                Some(Some(features)) => {
                    vec![json!({ "id": doc_id, "score": 1.0, "[features]": features })]
                }
                Some(None) => vec![json!({ "id": doc_id, "score": 1.0, "[features]": null })],
                None => Vec::new(),
            };
            let response = json!({
                "responseHeader": { "status": 0, "QTime": 1 },
                "response": { "numFound": docs.len(), "start": 0, "docs": docs }
            });
            (200, response.to_string())
        }
        _ => (404, error_body(404, "unknown endpoint")),
    }
}

pub const FEATURES_JSON: &str = r#"[
  { "store": "demo", "name": "title", "class": "org.apache.solr.ltr.feature.SolrFeature",
    "params": { "q": "{!field f=title}${user_query}" } },
  { "store": "demo", "name": "popularity", "class": "org.apache.solr.ltr.feature.FieldValueFeature",
    "params": { "field": "popularity" } }
]"#;

/// Shell script standing in for the trainer: records each call, writes a
/// two-feature LIBLINEAR model to its last argument.
pub fn trainer_script(counter: &Path) -> String {
    format!(
        r#"echo invoked >> "{counter}"
cat > "$2" <<'MODEL'
solver_type L2R_L2LOSS_SVC_DUAL
nr_class 2
label 1 -1
nr_feature 2
bias -1
w
0.75
-0.5
MODEL
"#,
        counter = counter.display()
    )
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub config: PipelineConfig,
}

impl Fixture {
    pub fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    pub fn trainer_calls(&self) -> usize {
        std::fs::read_to_string(self.path("trainer_calls"))
            .map(|text| text.lines().count())
            .unwrap_or(0)
    }
}

/// Write judgments, features and a fake trainer into a temp dir and build a
/// configuration for the `catalog` collection pointing at `port`.
pub fn fixture(port: u16, judgments: &str, trainer: &str) -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = |name: &str| dir.path().join(name);

    std::fs::write(path("user_queries.txt"), judgments).unwrap();
    std::fs::write(path("features.json"), FEATURES_JSON).unwrap();
    std::fs::write(path("train.sh"), trainer).unwrap();

    let config: PipelineConfig = serde_json::from_value(json!({
        "collection": "catalog",
        "requestHandler": "select",
        "featureStoreName": "demo",
        "efiParams": "efi.user_query='$USERQUERY'",
        "host": "127.0.0.1",
        "port": port,
        "featuresFile": path("features.json"),
        "userQueriesFile": path("user_queries.txt"),
        "trainingFile": path("training.txt"),
        "trainingLibraryLocation": "/bin/sh",
        "trainingLibraryOptions": path("train.sh"),
        "trainedModelFile": path("trained.model"),
        "solrModelFile": path("solr_model.json"),
        "solrModelName": "demoModel"
    }))
    .expect("fixture config");

    Fixture { dir, config }
}

/// Default fixture: the trainer script records calls next to the other files.
pub fn standard_fixture(port: u16, judgments: &str) -> Fixture {
    let fixture = fixture(port, judgments, "");
    let script = trainer_script(&fixture.path("trainer_calls"));
    std::fs::write(fixture.path("train.sh"), script).unwrap();
    fixture
}
