//! Pixel-aligned bounding boxes around a point.
//!
//! The box is computed in the point's local UTM zone:
//! 1. project the point,
//! 2. snap it to the nearest multiple of the resolution on both axes,
//! 3. convert the edge size to an even pixel count,
//! 4. extend half the edge in every direction.
//!
//! Snapping anchors every cube to a global grid rooted at the CRS origin, so
//! cubes computed independently for neighbouring points share pixel edges.
//! All rounding is half-away-from-zero.

use serde::{Deserialize, Serialize};

use cubo_common::{
    BoundingBox, CuboError, CuboResult, EdgeUnit, GeoPoint, GeoPolygon, ProjectedPoint,
    UnitRegistry,
};

/// Smallest cube edge, in pixels.
pub const MIN_EDGE_PIXELS: u32 = 2;

/// Everything computed for one cube location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeGeometry {
    /// Requested centre.
    pub point: GeoPoint,
    /// Centre projected into the local UTM zone, before snapping.
    pub projected: ProjectedPoint,
    /// Centre snapped to the resolution grid.
    pub center: ProjectedPoint,
    /// Pixels along each edge (even).
    pub edge_pixels: u32,
    /// Pixel width in CRS units.
    pub resolution: f64,
    /// Pixel height in CRS units. Equal to `resolution` except on
    /// non-square collection grids.
    pub resolution_y: f64,
    pub bbox: BoundingBox,
    /// The box corners in WGS84.
    pub footprint: GeoPolygon,
}

impl CubeGeometry {
    pub fn epsg(&self) -> u32 {
        self.bbox.epsg
    }
}

/// Computes cube bounding boxes.
///
/// Stateless apart from the unit table; safe to share between threads.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxResolver<'a> {
    units: &'a UnitRegistry,
}

impl Default for BoundingBoxResolver<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBoxResolver<'static> {
    /// Resolver using the process-wide unit table.
    pub fn new() -> Self {
        Self {
            units: UnitRegistry::global(),
        }
    }
}

impl<'a> BoundingBoxResolver<'a> {
    /// Resolver using a caller-extended unit table.
    pub fn with_units(units: &'a UnitRegistry) -> Self {
        Self { units }
    }

    /// Bounding box of a cube centred on `point`.
    pub fn resolve(
        &self,
        point: GeoPoint,
        resolution: f64,
        edge_size: f64,
        edge_unit: &EdgeUnit,
    ) -> CuboResult<BoundingBox> {
        self.locate(point, resolution, edge_size, edge_unit)
            .map(|geometry| geometry.bbox)
    }

    /// Like [`resolve`](Self::resolve), keeping the intermediate values and
    /// the geographic footprint.
    pub fn locate(
        &self,
        point: GeoPoint,
        resolution: f64,
        edge_size: f64,
        edge_unit: &EdgeUnit,
    ) -> CuboResult<CubeGeometry> {
        // Values may have been built without GeoPoint::new
        let point = GeoPoint::new(point.lat, point.lon)?;
        check_positive("resolution", resolution)?;
        let edge_pixels = self.edge_pixels(resolution, edge_size, edge_unit)?;

        let projected = projection::to_local_utm(&point)?;
        let center = projected.snap(resolution);

        let half = (edge_pixels / 2) as f64 * resolution;
        let bbox = BoundingBox::around(center.x, center.y, half, center.epsg);
        let footprint = projection::footprint(&bbox)?;

        tracing::debug!(
            lat = point.lat,
            lon = point.lon,
            epsg = center.epsg,
            edge_pixels,
            resolution,
            "Resolved cube bounding box"
        );

        Ok(CubeGeometry {
            point,
            projected,
            center,
            edge_pixels,
            resolution,
            resolution_y: resolution,
            bbox,
            footprint,
        })
    }

    /// Convert an edge size to an even pixel count of at least two.
    pub fn edge_pixels(
        &self,
        resolution: f64,
        edge_size: f64,
        edge_unit: &EdgeUnit,
    ) -> CuboResult<u32> {
        check_positive("resolution", resolution)?;
        check_positive("edge_size", edge_size)?;

        let raw = match edge_unit {
            EdgeUnit::Pixels => edge_size,
            EdgeUnit::Length(name) => self.units.to_metres(edge_size, name)? / resolution,
        };

        let rounded = raw.round();
        if rounded > u32::MAX as f64 - 1.0 {
            return Err(CuboError::invalid(
                "edge_size",
                format!("{} pixels is too large", rounded),
            ));
        }

        let mut pixels = rounded as u32;
        if pixels % 2 == 1 {
            pixels += 1;
        }

        if pixels < MIN_EDGE_PIXELS {
            return Err(CuboError::invalid(
                "edge_size",
                format!(
                    "{} {} is less than {} pixels at resolution {}",
                    edge_size, edge_unit, MIN_EDGE_PIXELS, resolution
                ),
            ));
        }

        Ok(pixels)
    }
}

fn check_positive(param: &str, value: f64) -> CuboResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CuboError::invalid(
            param,
            format!("must be a positive number, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> GeoPoint {
        GeoPoint::new(50.0, 10.0).unwrap()
    }

    #[test]
    fn test_edge_pixels_rounding() {
        let resolver = BoundingBoxResolver::new();
        let px = EdgeUnit::Pixels;
        assert_eq!(resolver.edge_pixels(10.0, 64.0, &px).unwrap(), 64);
        assert_eq!(resolver.edge_pixels(10.0, 63.0, &px).unwrap(), 64);
        assert_eq!(resolver.edge_pixels(10.0, 63.4, &px).unwrap(), 64);
        assert_eq!(resolver.edge_pixels(10.0, 64.5, &px).unwrap(), 66);
        assert_eq!(resolver.edge_pixels(10.0, 1.0, &px).unwrap(), 2);
    }

    #[test]
    fn test_edge_pixels_from_length() {
        let resolver = BoundingBoxResolver::new();
        let km = EdgeUnit::Length("km".into());
        assert_eq!(resolver.edge_pixels(10.0, 1.28, &km).unwrap(), 128);
        // 25 m at 10 m -> 2.5 px -> 3 -> 4
        let m = EdgeUnit::Length("m".into());
        assert_eq!(resolver.edge_pixels(10.0, 25.0, &m).unwrap(), 4);
    }

    #[test]
    fn test_edge_pixels_too_small() {
        let resolver = BoundingBoxResolver::new();
        let err = resolver
            .edge_pixels(10.0, 0.4, &EdgeUnit::Pixels)
            .unwrap_err();
        assert!(matches!(err, CuboError::InvalidParameter { ref param, .. } if param == "edge_size"));
    }

    #[test]
    fn test_invalid_resolution_and_edge() {
        let resolver = BoundingBoxResolver::new();
        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolver.resolve(point(), bad, 64.0, &EdgeUnit::Pixels),
                Err(CuboError::InvalidParameter { .. })
            ));
            assert!(matches!(
                resolver.resolve(point(), 10.0, bad, &EdgeUnit::Pixels),
                Err(CuboError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_center_snapped() {
        let geometry = BoundingBoxResolver::new()
            .locate(point(), 10.0, 64.0, &EdgeUnit::Pixels)
            .unwrap();
        assert_eq!(geometry.center.x, 571_670.0);
        assert_eq!(geometry.center.y, 5_539_110.0);
        assert_eq!(geometry.bbox.center(), (571_670.0, 5_539_110.0));
        assert_eq!(geometry.epsg(), 32632);
    }

    #[test]
    fn test_custom_units() {
        let units = UnitRegistry::default().with_unit("furlong", 201.168).unwrap();
        let resolver = BoundingBoxResolver::with_units(&units);
        // 1 furlong at 10 m -> 20.1 px -> 20
        assert_eq!(
            resolver
                .edge_pixels(10.0, 1.0, &EdgeUnit::Length("furlong".into()))
                .unwrap(),
            20
        );
        assert!(matches!(
            BoundingBoxResolver::new().edge_pixels(10.0, 1.0, &EdgeUnit::Length("furlong".into())),
            Err(CuboError::UnknownUnit(_))
        ));
    }
}
