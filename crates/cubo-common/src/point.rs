//! Geographic and projected point types.

use serde::{Deserialize, Serialize};

use crate::error::{CuboError, CuboResult};

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, rejecting coordinates outside the WGS84 domain.
    pub fn new(lat: f64, lon: f64) -> CuboResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CuboError::invalid(
                "lat",
                format!("{} is outside [-90, 90]", lat),
            ));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(CuboError::invalid(
                "lon",
                format!("{} is outside [-180, 180]", lon),
            ));
        }
        Ok(Self { lat, lon })
    }

    /// GeoJSON position order (lon, lat).
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// A point in a projected CRS identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub epsg: u32,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, epsg: u32) -> Self {
        Self { x, y, epsg }
    }

    /// Snap both coordinates to the nearest multiple of `step`.
    ///
    /// Ties round away from zero.
    pub fn snap(&self, step: f64) -> Self {
        Self {
            x: (self.x / step).round() * step,
            y: (self.y / step).round() * step,
            epsg: self.epsg,
        }
    }

    /// Euclidean distance to `(x, y)` in CRS units.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_bounds() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(matches!(
            GeoPoint::new(95.0, 0.0),
            Err(CuboError::InvalidParameter { ref param, .. }) if param == "lat"
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -180.5),
            Err(CuboError::InvalidParameter { ref param, .. }) if param == "lon"
        ));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_snap() {
        let p = ProjectedPoint::new(500_004.9, 5_538_635.0, 32632);
        let snapped = p.snap(10.0);
        assert_eq!(snapped.x, 500_000.0);
        assert_eq!(snapped.y, 5_538_640.0);
        assert_eq!(snapped.epsg, 32632);
    }

    #[test]
    fn test_snap_ties_away_from_zero() {
        let snapped = ProjectedPoint::new(5.0, 15.0, 32632).snap(10.0);
        assert_eq!(snapped.x, 10.0);
        assert_eq!(snapped.y, 20.0);

        let snapped = ProjectedPoint::new(-5.0, -25.0, 32632).snap(10.0);
        assert_eq!(snapped.x, -10.0);
        assert_eq!(snapped.y, -30.0);

        // 571_665 m is exactly halfway between two 10 m nodes
        assert_eq!(ProjectedPoint::new(571_665.0, 0.0, 32632).snap(10.0).x, 571_670.0);
    }

    #[test]
    fn test_distance() {
        let p = ProjectedPoint::new(0.0, 0.0, 32632);
        assert_eq!(p.distance_to(3.0, 4.0), 5.0);
    }
}
