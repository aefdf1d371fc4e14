//! Cube request parameters.

use serde::{Deserialize, Serialize};

use cubo_common::{CuboResult, DateRange, EdgeUnit, GeoPoint};

use crate::resolver::{BoundingBoxResolver, CubeGeometry};

/// Planetary Computer STAC API, the default catalog.
pub const PLANETARY_COMPUTER_STAC: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";

/// Default edge size, in pixels.
pub const DEFAULT_EDGE_SIZE: f64 = 128.0;

/// Default pixel size, in metres.
pub const DEFAULT_RESOLUTION: f64 = 10.0;

/// Where the imagery comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    /// A STAC catalog-search API.
    Stac { endpoint: String },
    /// A cloud-hosted image collection reached through a `CollectionSource`.
    CloudCollection,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Stac {
            endpoint: PLANETARY_COMPUTER_STAC.to_string(),
        }
    }
}

impl Backend {
    /// STAC endpoint, if this is a catalog backend.
    pub fn stac_endpoint(&self) -> Option<&str> {
        match self {
            Backend::Stac { endpoint } => Some(endpoint),
            Backend::CloudCollection => None,
        }
    }
}

/// Which point of a pixel the x/y coordinates label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelAnchor {
    /// Upper-left corner of each pixel.
    #[default]
    TopLeft,
    /// Centre of each pixel.
    Center,
}

impl PixelAnchor {
    /// Offset from a pixel's upper-left corner to the labelled point, as a
    /// fraction of the resolution.
    pub fn offset(&self) -> f64 {
        match self {
            PixelAnchor::TopLeft => 0.0,
            PixelAnchor::Center => 0.5,
        }
    }
}

/// A request for one mini-cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeRequest {
    pub lat: f64,
    pub lon: f64,
    pub collection: String,
    pub dates: DateRange,
    /// Band (asset) names; `None` selects every data asset.
    #[serde(default)]
    pub bands: Option<Vec<String>>,
    #[serde(default = "default_edge_size")]
    pub edge_size: f64,
    #[serde(default)]
    pub edge_unit: EdgeUnit,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub pixel_anchor: PixelAnchor,
    /// Extra STAC search body fields (e.g. `query`, `filter`).
    #[serde(default)]
    pub query: serde_json::Map<String, serde_json::Value>,
    /// Stop paging once this many items were collected.
    #[serde(default)]
    pub max_items: Option<usize>,
}

fn default_edge_size() -> f64 {
    DEFAULT_EDGE_SIZE
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

impl CubeRequest {
    /// Request with default edge size, resolution and backend.
    pub fn new(lat: f64, lon: f64, collection: impl Into<String>, dates: DateRange) -> Self {
        Self {
            lat,
            lon,
            collection: collection.into(),
            dates,
            bands: None,
            edge_size: DEFAULT_EDGE_SIZE,
            edge_unit: EdgeUnit::Pixels,
            resolution: DEFAULT_RESOLUTION,
            backend: Backend::default(),
            pixel_anchor: PixelAnchor::default(),
            query: serde_json::Map::new(),
            max_items: None,
        }
    }

    pub fn with_bands<S: Into<String>>(mut self, bands: impl IntoIterator<Item = S>) -> Self {
        self.bands = Some(bands.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_edge_size(mut self, edge_size: f64, unit: EdgeUnit) -> Self {
        self.edge_size = edge_size;
        self.edge_unit = unit;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_stac(mut self, endpoint: impl Into<String>) -> Self {
        self.backend = Backend::Stac {
            endpoint: endpoint.into(),
        };
        self
    }

    pub fn with_cloud_collection(mut self) -> Self {
        self.backend = Backend::CloudCollection;
        self
    }

    pub fn with_pixel_anchor(mut self, anchor: PixelAnchor) -> Self {
        self.pixel_anchor = anchor;
        self
    }

    /// Add an extra search body field.
    pub fn with_query_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn point(&self) -> CuboResult<GeoPoint> {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Resolve the cube geometry with the default unit table.
    pub fn geometry(&self) -> CuboResult<CubeGeometry> {
        self.geometry_with(&BoundingBoxResolver::new())
    }

    pub fn geometry_with(&self, resolver: &BoundingBoxResolver<'_>) -> CuboResult<CubeGeometry> {
        resolver.locate(self.point()?, self.resolution, self.edge_size, &self.edge_unit)
    }
}
