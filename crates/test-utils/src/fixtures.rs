//! Reference locations and STAC fixtures.

use serde_json::{json, Value};

/// Reference points as (lat, lon).
pub mod points {
    /// Central Germany, UTM zone 32N.
    pub const GERMANY: (f64, f64) = (50.0, 10.0);

    /// Sydney, UTM zone 56S.
    pub const SYDNEY: (f64, f64) = (-33.8688, 151.2093);

    /// New York City, UTM zone 18N.
    pub const NEW_YORK: (f64, f64) = (40.7128, -74.0060);

    /// On the equator, zone 31N.
    pub const NULL_ISLAND: (f64, f64) = (0.0, 0.0);

    pub const NORTH_POLE: (f64, f64) = (90.0, 0.0);
    pub const SOUTH_POLE: (f64, f64) = (-90.0, 0.0);
}

/// Projected coordinates of the reference points in their own zone, as
/// (epsg, easting, northing).
pub mod projected {
    pub const GERMANY: (u32, f64, f64) = (32632, 571_666.4475, 5_539_109.8153);
    pub const SYDNEY: (u32, f64, f64) = (32756, 334_368.634, 6_250_948.345);
    pub const NEW_YORK: (u32, f64, f64) = (32618, 583_959.37, 4_507_350.998);
}

pub const COLLECTION: &str = "sentinel-2-l2a";
pub const START_DATE: &str = "2021-06-01";
pub const END_DATE: &str = "2021-06-10";

/// A Sentinel-2 style STAC item with one asset per band.
///
/// Asset hrefs point at `href_base/{id}/{band}.tif`.
pub fn stac_item(id: &str, datetime: &str, bands: &[&str], href_base: &str) -> Value {
    let mut assets = serde_json::Map::new();
    for band in bands {
        assets.insert(
            band.to_string(),
            json!({
                "href": format!("{}/{}/{}.tif", href_base.trim_end_matches('/'), id, band),
                "type": "image/tiff; application=geotiff; profile=cloud-optimized",
                "roles": ["data"]
            }),
        );
    }
    assets.insert(
        "rendered_preview".to_string(),
        json!({
            "href": format!("{}/{}/preview.png", href_base.trim_end_matches('/'), id),
            "type": "image/png",
            "roles": ["overview"]
        }),
    );

    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": id,
        "collection": COLLECTION,
        "geometry": null,
        "bbox": [9.0, 49.5, 10.5, 50.5],
        "properties": {
            "datetime": datetime,
            "proj:epsg": 32632,
            "eo:cloud_cover": 3.2
        },
        "assets": assets,
        "links": []
    })
}

/// Items on consecutive days starting at `START_DATE`.
pub fn daily_items(count: usize, bands: &[&str], href_base: &str) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let id = format!("S2A_MSIL2A_202106{:02}", i + 1);
            let datetime = format!("2021-06-{:02}T10:30:21Z", i + 1);
            stac_item(&id, &datetime, bands, href_base)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stac_item_shape() {
        let item = stac_item("a", "2021-06-03T10:00:00Z", &["B02", "B03"], "https://example.com/");
        assert_eq!(item["assets"]["B02"]["href"], "https://example.com/a/B02.tif");
        assert_eq!(item["assets"].as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_daily_items() {
        let items = daily_items(3, &["B02"], "https://example.com");
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["properties"]["datetime"], "2021-06-03T10:30:21Z");
    }
}
