//! Bounding box and footprint types.

use serde::{Deserialize, Serialize};

/// A bounding box in a projected CRS.
///
/// Edges are in the CRS's linear unit (metres for UTM).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub epsg: u32,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    pub fn new(west: f64, south: f64, east: f64, north: f64, epsg: u32) -> Self {
        Self {
            west,
            south,
            east,
            north,
            epsg,
        }
    }

    /// Square box of half-width `half` around `(x, y)`.
    pub fn around(x: f64, y: f64, half: f64, epsg: u32) -> Self {
        Self::new(x - half, y - half, x + half, y + half, epsg)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Centre of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    /// Corners in ring order: SW, SE, NE, NW.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.west, self.south),
            (self.east, self.south),
            (self.east, self.north),
            (self.west, self.north),
        ]
    }
}

/// A closed WGS84 ring, positions in (lon, lat) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    pub ring: Vec<[f64; 2]>,
}

impl GeoPolygon {
    /// Build a polygon from open or closed (lon, lat) positions.
    ///
    /// The ring is closed if the last position differs from the first.
    pub fn from_positions(mut positions: Vec<[f64; 2]>) -> Self {
        if let (Some(first), Some(last)) = (positions.first().copied(), positions.last()) {
            if first != *last {
                positions.push(first);
            }
        }
        Self { ring: positions }
    }

    /// True when an edge of the ring jumps across the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.ring.windows(2).any(|w| (w[1][0] - w[0][0]).abs() > 180.0)
    }

    /// Split a ring that crosses the antimeridian into a western and an
    /// eastern part, each with longitudes in [-180, 180].
    ///
    /// Rings that do not cross are returned as they are.
    pub fn split_at_antimeridian(&self) -> Vec<GeoPolygon> {
        if !self.crosses_antimeridian() {
            return vec![self.clone()];
        }

        // Continuous longitudes, starting from the first position
        let mut unwrapped = Vec::with_capacity(self.ring.len());
        let mut prev: Option<f64> = None;
        for &[lon, lat] in &self.ring {
            let lon = match prev {
                Some(p) if lon - p > 180.0 => lon - 360.0,
                Some(p) if p - lon > 180.0 => lon + 360.0,
                _ => lon,
            };
            unwrapped.push([lon, lat]);
            prev = Some(lon);
        }

        // Clip at whichever meridian the unwrapped ring spills over, then
        // bring the spilled part back into [-180, 180]
        let (line, offset) = if unwrapped.iter().any(|p| p[0] > 180.0) {
            (180.0, -360.0)
        } else {
            (-180.0, 360.0)
        };
        let mut west = clip_at_meridian(&unwrapped, line, true);
        let mut east = clip_at_meridian(&unwrapped, line, false);
        let spilled = if line > 0.0 { &mut east } else { &mut west };
        for p in spilled.iter_mut() {
            p[0] += offset;
        }

        [west, east]
            .into_iter()
            .filter(|ring| ring.len() >= 3)
            .map(GeoPolygon::from_positions)
            .collect()
    }

    /// GeoJSON geometry object: a `Polygon`, or a `MultiPolygon` when the
    /// ring crosses the antimeridian.
    pub fn to_geojson(&self) -> serde_json::Value {
        if !self.crosses_antimeridian() {
            return serde_json::json!({
                "type": "Polygon",
                "coordinates": [self.ring],
            });
        }
        let parts: Vec<_> = self
            .split_at_antimeridian()
            .into_iter()
            .map(|part| vec![part.ring])
            .collect();
        serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": parts,
        })
    }
}

/// Clip a closed ring to one side of the meridian `line`.
fn clip_at_meridian(ring: &[[f64; 2]], line: f64, keep_west: bool) -> Vec<[f64; 2]> {
    let inside = |p: &[f64; 2]| if keep_west { p[0] <= line } else { p[0] >= line };
    let mut out = Vec::with_capacity(ring.len() + 2);
    for pair in ring.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        if inside(&cur) {
            out.push(cur);
        }
        if inside(&cur) != inside(&next) && cur[0] != line && next[0] != line {
            let t = (line - cur[0]) / (next[0] - cur[0]);
            out.push([line, cur[1] + t * (next[1] - cur[1])]);
        }
    }
    out
}
