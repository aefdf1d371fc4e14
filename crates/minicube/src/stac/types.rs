//! STAC API item and search response types.
//!
//! Only the fields needed to stack items into a cube are typed; everything
//! else is kept in `extra` maps so items round-trip unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles that mark an asset as metadata rather than raster data.
const NON_DATA_ROLES: &[&str] = &["thumbnail", "overview", "metadata", "visual"];

/// A GeoJSON `FeatureCollection` of STAC items (one search page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCollection {
    #[serde(rename = "type", default = "feature_collection")]
    pub type_: String,
    #[serde(default)]
    pub features: Vec<Item>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

impl ItemCollection {
    /// The `rel = "next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == "next")
    }
}

/// A STAC item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default)]
    pub properties: ItemProperties,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    /// Acquisition time: `datetime`, or `start_datetime` for ranged items.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.properties.datetime.or(self.properties.start_datetime)
    }

    /// Names of the assets carrying raster data.
    pub fn data_asset_names(&self) -> impl Iterator<Item = &str> {
        self.assets
            .iter()
            .filter(|(_, asset)| asset.is_data())
            .map(|(name, _)| name.as_str())
    }
}

/// Item properties used for stacking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(rename = "proj:epsg", default, skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A STAC asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Asset {
    /// Whether the asset holds raster data.
    ///
    /// Assets without roles count as data; assets with roles need `data` or
    /// no metadata-only role.
    pub fn is_data(&self) -> bool {
        match &self.roles {
            None => true,
            Some(roles) if roles.iter().any(|r| r == "data") => true,
            Some(roles) => !roles.iter().any(|r| NON_DATA_ROLES.contains(&r.as_str())),
        }
    }
}

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// HTTP method for following the link (STAC API paging). Defaults to GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request body for POST paging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Map<String, serde_json::Value>>,
    /// Whether `body` is merged into the previous request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

impl Link {
    pub fn is_post(&self) -> bool {
        self.method
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("POST"))
            .unwrap_or(false)
    }
}
