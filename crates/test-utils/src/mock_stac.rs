//! In-process mock of a STAC API and the Planetary Computer SAS service.
//!
//! Items are split into fixed-size pages. Every request body and token
//! request is recorded so tests can assert on what a client sent.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the mock advertises its `next` links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// `POST /search` with `{"page": n}` merged into the previous body.
    PostMerge,
    /// `GET /pages/{n}`.
    Get,
}

#[derive(Debug)]
struct MockState {
    base_url: String,
    items: Vec<Value>,
    page_size: usize,
    paging: Paging,
    fail_status: Option<u16>,
    search_bodies: Mutex<Vec<Value>>,
    page_requests: Mutex<Vec<usize>>,
    token_requests: Mutex<Vec<String>>,
}

impl MockState {
    fn page(&self, page: usize) -> Value {
        let start = page * self.page_size;
        let features: Vec<Value> = self
            .items
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        let mut links = vec![json!({"rel": "self", "href": format!("{}/search", self.base_url)})];
        if start + self.page_size < self.items.len() {
            links.push(match self.paging {
                Paging::PostMerge => json!({
                    "rel": "next",
                    "href": format!("{}/search", self.base_url),
                    "method": "POST",
                    "body": {"page": page + 1},
                    "merge": true
                }),
                Paging::Get => json!({
                    "rel": "next",
                    "href": format!("{}/pages/{}", self.base_url, page + 1),
                    "type": "application/geo+json"
                }),
            });
        }

        json!({
            "type": "FeatureCollection",
            "features": features,
            "links": links,
            "numberMatched": self.items.len()
        })
    }

    fn record_page(&self, page: usize) {
        if let Ok(mut pages) = self.page_requests.lock() {
            pages.push(page);
        }
    }

    fn failure(&self) -> Option<Response> {
        let status = StatusCode::from_u16(self.fail_status?).ok()?;
        Some((status, Json(json!({"code": "ServerError", "description": "mock failure"}))).into_response())
    }
}

/// Builder for a [`MockStac`].
#[derive(Debug, Clone)]
pub struct MockStacBuilder {
    items: Vec<Value>,
    page_size: usize,
    paging: Paging,
    fail_status: Option<u16>,
}

impl MockStacBuilder {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    /// Answer every search with this HTTP status.
    pub fn fail_with(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    pub async fn start(self) -> MockStac {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock STAC listener");
        let addr = listener.local_addr().expect("mock STAC address");
        let base_url = format!("http://{}", addr);

        let state = Arc::new(MockState {
            base_url: base_url.clone(),
            items: self.items,
            page_size: self.page_size,
            paging: self.paging,
            fail_status: self.fail_status,
            search_bodies: Mutex::new(Vec::new()),
            page_requests: Mutex::new(Vec::new()),
            token_requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/search", post(search_handler))
            .route("/pages/:page", get(page_handler))
            .route("/token/:collection", get(token_handler))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        MockStac {
            base_url,
            state,
            handle,
        }
    }
}

/// A running mock server; shut down on drop.
#[derive(Debug)]
pub struct MockStac {
    base_url: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockStac {
    pub fn builder(items: Vec<Value>) -> MockStacBuilder {
        MockStacBuilder {
            items,
            page_size: 100,
            paging: Paging::PostMerge,
            fail_status: None,
        }
    }

    /// Serve `items` on a single page.
    pub async fn start(items: Vec<Value>) -> Self {
        Self::builder(items).start().await
    }

    /// Base URL, usable as both STAC endpoint and SAS endpoint.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// JSON bodies of every `POST /search`.
    pub fn search_bodies(&self) -> Vec<Value> {
        self.state
            .search_bodies
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    /// Page numbers served, in order.
    pub fn page_requests(&self) -> Vec<usize> {
        self.state
            .page_requests
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Collections tokens were requested for, in order.
    pub fn token_requests(&self) -> Vec<String> {
        self.state
            .token_requests
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockStac {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Token handed out for a collection.
pub fn mock_token(collection: &str) -> String {
    format!("st=2021-06-01&se=2021-06-02&sp=rl&sig=mock-{}", collection)
}

async fn search_handler(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if let Ok(mut bodies) = state.search_bodies.lock() {
        bodies.push(body.clone());
    }
    if let Some(failure) = state.failure() {
        return failure;
    }
    let page = body.get("page").and_then(Value::as_u64).unwrap_or(0) as usize;
    state.record_page(page);
    Json(state.page(page)).into_response()
}

async fn page_handler(State(state): State<Arc<MockState>>, Path(page): Path<usize>) -> Response {
    if let Some(failure) = state.failure() {
        return failure;
    }
    state.record_page(page);
    Json(state.page(page)).into_response()
}

async fn token_handler(
    State(state): State<Arc<MockState>>,
    Path(collection): Path<String>,
) -> impl IntoResponse {
    if let Ok(mut tokens) = state.token_requests.lock() {
        tokens.push(collection.clone());
    }
    Json(json!({
        "msft:expiry": "2021-06-02T00:00:00Z",
        "token": mock_token(&collection)
    }))
}
