//! STAC API item search client.
//!
//! Issues `POST {endpoint}/search` and follows `next` links until the result
//! set is exhausted, the item cap is reached or the page cap is hit.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use cubo_common::{CuboError, CuboResult};

use super::types::{Item, ItemCollection, Link};

/// HTTP settings for catalog access.
#[derive(Debug, Clone)]
pub struct StacClientConfig {
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Items requested per page (`limit`)
    pub page_size: usize,
    /// Upper bound on pages followed for one search
    pub max_pages: usize,
    pub user_agent: String,
}

impl Default for StacClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            page_size: 100,
            max_pages: 100,
            user_agent: format!("cubo/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl StacClientConfig {
    pub(crate) fn build_client(&self) -> CuboResult<Client> {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CuboError::Http(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Parameters of one item search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub collections: Vec<String>,
    /// `start/end` interval
    pub datetime: String,
    /// GeoJSON geometry
    pub intersects: Value,
    /// Extra body fields; never override collections, datetime or intersects
    pub extra: Map<String, Value>,
    pub max_items: Option<usize>,
}

impl SearchParams {
    /// JSON body of the first search request.
    pub fn body(&self, page_size: usize) -> Map<String, Value> {
        let mut body = self.extra.clone();
        // A caller-supplied limit replaces the configured page size
        body.entry("limit").or_insert_with(|| Value::from(page_size));
        body.insert("collections".into(), Value::from(self.collections.clone()));
        body.insert("datetime".into(), Value::from(self.datetime.clone()));
        body.insert("intersects".into(), self.intersects.clone());
        body
    }
}

/// Client for the STAC API item search.
#[derive(Debug, Clone)]
pub struct StacClient {
    client: Client,
    config: StacClientConfig,
}

impl StacClient {
    pub fn new(config: StacClientConfig) -> CuboResult<Self> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// Client sharing an existing connection pool.
    pub fn with_client(client: Client, config: StacClientConfig) -> Self {
        Self { client, config }
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Run a search and collect every matching item.
    #[instrument(skip(self, params), fields(endpoint = %endpoint, collections = ?params.collections))]
    pub async fn search(&self, endpoint: &str, params: &SearchParams) -> CuboResult<Vec<Item>> {
        let url = format!("{}/search", endpoint.trim_end_matches('/'));
        let mut body = params.body(self.config.page_size);
        let mut request = self.client.post(&url).json(&body);

        let mut items = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(request).await?;
            pages += 1;
            metrics::counter!("cubo_stac_pages_total").increment(1);
            metrics::counter!("cubo_stac_items_total").increment(page.features.len() as u64);

            debug!(
                page = pages,
                items = page.features.len(),
                matched = ?page.number_matched,
                "Received search page"
            );

            items.extend(page.features.iter().cloned());

            if let Some(max) = params.max_items {
                if items.len() >= max {
                    items.truncate(max);
                    break;
                }
            }

            let next = match page.next_link() {
                Some(link) => link.clone(),
                None => break,
            };
            // An empty page with a next link would loop forever on some servers
            if page.features.is_empty() {
                warn!("Empty page carried a next link, stopping");
                break;
            }
            if pages >= self.config.max_pages {
                warn!(max_pages = self.config.max_pages, "Page limit reached, stopping search");
                break;
            }

            request = self.next_request(&next, &mut body);
        }

        info!(items = items.len(), pages, "Search completed");
        Ok(items)
    }

    fn next_request(&self, link: &Link, body: &mut Map<String, Value>) -> RequestBuilder {
        if !link.is_post() {
            return self.client.get(&link.href);
        }

        match &link.body {
            Some(next_body) if link.merge.unwrap_or(false) => {
                for (key, value) in next_body {
                    body.insert(key.clone(), value.clone());
                }
            }
            Some(next_body) => *body = next_body.clone(),
            None => {}
        }
        self.client.post(&link.href).json(body)
    }

    async fn fetch_page(&self, request: RequestBuilder) -> CuboResult<ItemCollection> {
        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CuboError::Catalog(format!(
                "search returned {}: {}",
                status,
                truncate(&text, 200)
            )));
        }

        response
            .json::<ItemCollection>()
            .await
            .map_err(|e| CuboError::Catalog(format!("invalid search response: {}", e)))
    }
}

pub(crate) fn http_error(err: reqwest::Error) -> CuboError {
    CuboError::Http(err.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
