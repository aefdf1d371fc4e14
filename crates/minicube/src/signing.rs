//! Planetary Computer asset signing.
//!
//! Blob storage assets listed by the Planetary Computer catalog are only
//! readable with a short-lived SAS token appended as the URL query. Tokens
//! are issued per collection by the SAS API and cached for the life of the
//! signer.

use std::collections::HashMap;

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use cubo_common::{CuboError, CuboResult};

use crate::request::PLANETARY_COMPUTER_STAC;
use crate::stac::client::http_error;
use crate::stac::Item;

/// Planetary Computer SAS token API.
pub const PLANETARY_COMPUTER_SAS: &str = "https://planetarycomputer.microsoft.com/api/sas/v1";

/// Host suffix of Azure blob storage accounts.
const BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// Whether `endpoint` is the Planetary Computer STAC API.
pub fn is_planetary_computer(endpoint: &str) -> bool {
    endpoint.trim_end_matches('/') == PLANETARY_COMPUTER_STAC
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Signs asset hrefs with per-collection SAS tokens.
#[derive(Debug)]
pub struct PlanetaryComputerSigner {
    client: Client,
    sas_endpoint: String,
    tokens: Mutex<HashMap<String, String>>,
}

impl PlanetaryComputerSigner {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, PLANETARY_COMPUTER_SAS)
    }

    /// Signer talking to a different SAS API (mirrors, tests).
    pub fn with_endpoint(client: Client, sas_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            sas_endpoint: sas_endpoint.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Token for a collection, fetched once and then served from cache.
    #[instrument(skip(self))]
    pub async fn token(&self, collection: &str) -> CuboResult<String> {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.get(collection) {
            return Ok(token.clone());
        }

        let url = format!("{}/token/{}", self.sas_endpoint, collection);
        let response = self.client.get(&url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CuboError::Catalog(format!(
                "token request for '{}' returned {}",
                collection, status
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CuboError::Catalog(format!("invalid token response: {}", e)))?;

        debug!(collection, "Fetched SAS token");
        tokens.insert(collection.to_string(), body.token.clone());
        Ok(body.token)
    }

    /// Sign every blob-hosted asset of `items` in place.
    ///
    /// The token is chosen by each item's own collection, falling back to
    /// `default_collection`.
    pub async fn sign_items(&self, items: &mut [Item], default_collection: &str) -> CuboResult<()> {
        for item in items.iter_mut() {
            let collection = item
                .collection
                .clone()
                .unwrap_or_else(|| default_collection.to_string());

            for asset in item.assets.values_mut() {
                if !needs_signing(&asset.href) {
                    continue;
                }
                let token = self.token(&collection).await?;
                asset.href = append_token(&asset.href, &token);
            }
        }
        Ok(())
    }
}

/// Blob storage hrefs without an existing signature.
fn needs_signing(href: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };
    let on_blob_storage = url
        .host_str()
        .map(|host| host.ends_with(BLOB_HOST_SUFFIX))
        .unwrap_or(false);
    let already_signed = url.query_pairs().any(|(key, _)| key == "sig");
    on_blob_storage && !already_signed
}

fn append_token(href: &str, token: &str) -> String {
    let token = token.trim_start_matches('?');
    if href.contains('?') {
        format!("{}&{}", href, token)
    } else {
        format!("{}?{}", href, token)
    }
}
