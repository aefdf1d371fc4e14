//! Cube request files.
//!
//! A request can be described in YAML and refined by command-line flags:
//!
//! ```yaml
//! lat: 50.0
//! lon: 10.0
//! collection: sentinel-2-l2a
//! start_date: "2021-06-01"
//! end_date: "2021-06-10"
//! bands: [B02, B03, B04]
//! edge_size: 64
//! edge_unit: px
//! resolution: 10
//! pixel_anchor: center
//! stac: https://planetarycomputer.microsoft.com/api/stac/v1
//! max_items: 50
//! query:
//!   query:
//!     eo:cloud_cover: { lt: 20 }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use cubo_common::{DateRange, EdgeUnit};
use minicube::request::{DEFAULT_EDGE_SIZE, DEFAULT_RESOLUTION};
use minicube::{CubeRequest, PixelAnchor};

/// A cube request with every field optional, as read from YAML or flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub collection: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub bands: Option<Vec<String>>,
    pub edge_size: Option<f64>,
    pub edge_unit: Option<EdgeUnit>,
    pub resolution: Option<f64>,
    pub pixel_anchor: Option<PixelAnchor>,
    pub stac: Option<String>,
    pub max_items: Option<usize>,
    /// Extra STAC search body fields.
    #[serde(default)]
    pub query: serde_json::Map<String, serde_json::Value>,
}

impl RequestFile {
    /// Load a request from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))?;

        let request: RequestFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse request file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded request file");
        Ok(request)
    }

    /// Fields set in `overrides` replace ours; query fields are merged.
    pub fn merge(mut self, overrides: RequestFile) -> Self {
        macro_rules! take {
            ($($field:ident),+) => {
                $(if overrides.$field.is_some() {
                    self.$field = overrides.$field;
                })+
            };
        }
        take!(
            lat,
            lon,
            collection,
            start_date,
            end_date,
            bands,
            edge_size,
            edge_unit,
            resolution,
            pixel_anchor,
            stac,
            max_items
        );
        self.query.extend(overrides.query);
        self
    }

    /// Build the request, falling back to `default_stac` for the catalog.
    pub fn into_request(self, default_stac: &str) -> Result<CubeRequest> {
        let lat = self.lat.context("missing 'lat'")?;
        let lon = self.lon.context("missing 'lon'")?;
        let collection = self.collection.context("missing 'collection'")?;
        let start = self.start_date.context("missing 'start_date'")?;
        let end = self.end_date.context("missing 'end_date'")?;
        let dates = DateRange::parse(&start, &end)?;

        let mut request = CubeRequest::new(lat, lon, collection, dates)
            .with_edge_size(
                self.edge_size.unwrap_or(DEFAULT_EDGE_SIZE),
                self.edge_unit.unwrap_or_default(),
            )
            .with_resolution(self.resolution.unwrap_or(DEFAULT_RESOLUTION))
            .with_pixel_anchor(self.pixel_anchor.unwrap_or_default())
            .with_stac(self.stac.unwrap_or_else(|| default_stac.to_string()));

        if let Some(bands) = self.bands.filter(|b| !b.is_empty()) {
            request = request.with_bands(bands);
        }
        if let Some(max_items) = self.max_items {
            request = request.with_max_items(max_items);
        }
        request.query = self.query;
        Ok(request)
    }
}
