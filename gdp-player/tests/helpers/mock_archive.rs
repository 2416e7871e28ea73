//! In-process stand-in for the archive.org API
//!
//! Serves `advancedsearch.php`, `metadata/{id}` and `download/{id}/{file}`
//! from canned data on an ephemeral loopback port.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Canned archive contents
#[derive(Clone, Default)]
pub struct MockArchive {
    search_results: Vec<String>,
    raw_search_body: Option<String>,
    metadata: HashMap<String, Value>,
    files: HashMap<String, Vec<u8>>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// A show returned by every search, with its metadata document
    pub fn with_show(mut self, identifier: &str, metadata: Value) -> Self {
        self.search_results.push(identifier.to_string());
        self.metadata.insert(identifier.to_string(), metadata);
        self
    }

    /// A show returned by searches whose metadata request fails with 500
    pub fn with_broken_show(mut self, identifier: &str) -> Self {
        self.search_results.push(identifier.to_string());
        self
    }

    pub fn with_file(mut self, identifier: &str, name: &str, body: &[u8]) -> Self {
        self.files
            .insert(format!("{}/{}", identifier, name), body.to_vec());
        self
    }

    /// Replace the search response body verbatim
    pub fn with_raw_search_body(mut self, body: &str) -> Self {
        self.raw_search_body = Some(body.to_string());
        self
    }

    pub async fn start(self) -> MockArchiveServer {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            archive: Arc::new(self),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/advancedsearch.php", get(search))
            .route("/metadata/:identifier", get(metadata))
            .route("/download/:identifier/*file", get(download))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock archive");
        let addr = listener.local_addr().expect("mock archive address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock archive server");
        });

        MockArchiveServer {
            base_url: format!("http://{}", addr),
            requests,
            handle,
        }
    }
}

pub struct MockArchiveServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockArchiveServer {
    /// Requests seen so far, as `search:<q>`, `metadata:<id>` or `download:<id>/<file>`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockArchiveServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct MockState {
    archive: Arc<MockArchive>,
    requests: Arc<Mutex<Vec<String>>>,
}

async fn search(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();
    state.requests.lock().unwrap().push(format!("search:{}", query));

    if let Some(body) = &state.archive.raw_search_body {
        return (StatusCode::OK, body.clone()).into_response();
    }

    let docs: Vec<Value> = state
        .archive
        .search_results
        .iter()
        .map(|id| json!({ "identifier": id }))
        .collect();

    Json(json!({
        "responseHeader": { "status": 0 },
        "response": { "numFound": docs.len(), "start": 0, "docs": docs }
    }))
    .into_response()
}

async fn metadata(State(state): State<MockState>, Path(identifier): Path<String>) -> Response {
    state
        .requests
        .lock()
        .unwrap()
        .push(format!("metadata:{}", identifier));

    match state.archive.metadata.get(&identifier) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "metadata unavailable").into_response(),
    }
}

async fn download(
    State(state): State<MockState>,
    Path((identifier, file)): Path<(String, String)>,
) -> Response {
    let key = format!("{}/{}", identifier, file.trim_start_matches('/'));
    state.requests.lock().unwrap().push(format!("download:{}", key));

    match state.archive.files.get(&key) {
        Some(body) => (StatusCode::OK, body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such file").into_response(),
    }
}

/// Metadata document in archive.org's shape
pub fn show_metadata(date: &str, title: &str, creator: &str, files: &[(&str, &str)]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|(name, format)| json!({ "name": name, "format": format, "source": "derivative" }))
        .collect();

    json!({
        "created": 1700000000,
        "files": files,
        "metadata": {
            "identifier": "ignored",
            "date": date,
            "title": title,
            "creator": creator,
            "mediatype": "etree"
        }
    })
}
