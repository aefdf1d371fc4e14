//! Coordinate reference system transformations.
//!
//! Implements WGS84 <-> UTM from scratch without external projection
//! libraries.

pub mod transverse_mercator;
pub mod utm;

pub use transverse_mercator::TransverseMercator;
pub use utm::{Hemisphere, UtmZone};

use cubo_common::{BoundingBox, CuboError, GeoPoint, GeoPolygon, ProjectedPoint};

/// Errors raised by projection lookups.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Projection produced non-finite coordinates for ({lat}, {lon})")]
    NonFinite { lat: f64, lon: f64 },
}

impl From<ProjectionError> for CuboError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::NonFinite { .. } => CuboError::invalid("point", err.to_string()),
            ProjectionError::UnsupportedCrs(_) => CuboError::Projection(err.to_string()),
        }
    }
}

/// Projection for a WGS 84 / UTM EPSG code.
pub fn for_epsg(epsg: u32) -> Result<TransverseMercator, ProjectionError> {
    UtmZone::from_epsg(epsg)
        .map(TransverseMercator::utm)
        .ok_or(ProjectionError::UnsupportedCrs(epsg))
}

/// Project a point into its local UTM zone.
pub fn to_local_utm(point: &GeoPoint) -> Result<ProjectedPoint, ProjectionError> {
    let zone = UtmZone::for_point(point.lat, point.lon);
    to_epsg(point, zone.epsg())
}

/// Project a point into a given UTM EPSG code.
pub fn to_epsg(point: &GeoPoint, epsg: u32) -> Result<ProjectedPoint, ProjectionError> {
    let (x, y) = for_epsg(epsg)?.forward(point.lat, point.lon);
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFinite {
            lat: point.lat,
            lon: point.lon,
        });
    }
    Ok(ProjectedPoint::new(x, y, epsg))
}

/// Inverse-project a UTM point back to WGS84 as `(lat, lon)`.
pub fn to_geographic(point: &ProjectedPoint) -> Result<(f64, f64), ProjectionError> {
    Ok(for_epsg(point.epsg)?.inverse(point.x, point.y))
}

/// Geographic footprint of a projected box: its four corners inverse
/// projected, as a closed ring.
///
/// Longitudes are wrapped into [-180, 180], so boxes next to the
/// antimeridian give a ring that crosses it (see
/// [`GeoPolygon::split_at_antimeridian`]).
pub fn footprint(bbox: &BoundingBox) -> Result<GeoPolygon, ProjectionError> {
    let proj = for_epsg(bbox.epsg)?;
    let positions = bbox
        .corners()
        .iter()
        .map(|&(x, y)| {
            let (lat, lon) = proj.inverse(x, y);
            [wrap_longitude(lon), lat]
        })
        .collect();
    Ok(GeoPolygon::from_positions(positions))
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}
