//! Labeled band × time × y × x mini-cubes.
//!
//! Coordinates, attributes and the asset href of every (band, time) slice
//! are known as soon as the catalog was searched. Pixel data is held in
//! memory and stays NaN until [`MiniCube::load`] reads the windows through
//! an [`AssetReader`], so cube sizes are capped by [`MAX_CUBE_VALUES`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cubo_common::{BoundingBox, CuboError, CuboResult};

use crate::request::PixelAnchor;
use crate::resolver::CubeGeometry;

/// Dimension names, outermost first.
pub const DIMS: [&str; 4] = ["band", "time", "y", "x"];

/// Largest number of values a cube may hold, both for its pixel data and
/// for its `y × x` plane (1 GiB of `f32`).
pub const MAX_CUBE_VALUES: usize = 1 << 28;

/// One acquisition: its time, identifier and band -> href mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    pub time: DateTime<Utc>,
    pub id: String,
    pub assets: BTreeMap<String, String>,
}

/// Descriptive attributes attached to a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeAttrs {
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stac: Option<String>,
    pub epsg: u32,
    pub resolution: f64,
    pub edge_size: u32,
    pub central_lat: f64,
    pub central_lon: f64,
    /// Projected centre before snapping.
    pub central_x: f64,
    pub central_y: f64,
    pub time_coverage_start: String,
    pub time_coverage_end: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_ids: Vec<String>,
}

/// The pixel window to read for one slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterWindow {
    pub bbox: BoundingBox,
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
}

impl RasterWindow {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads a window of one raster asset, resampled onto the cube grid.
///
/// Implementations return `width * height` values, row-major from the
/// north-west corner, with NaN for nodata.
#[async_trait]
pub trait AssetReader: Send + Sync {
    async fn read_window(&self, href: &str, window: &RasterWindow) -> CuboResult<Vec<f32>>;
}

/// A band × time × y × x array with labeled coordinates.
#[derive(Debug, Clone)]
pub struct MiniCube {
    pub name: String,
    pub bands: Vec<String>,
    pub times: Vec<DateTime<Utc>>,
    /// Item or image identifier per time step.
    pub item_ids: Vec<String>,
    /// Northing per row, descending.
    pub y: Vec<f64>,
    /// Easting per column, ascending.
    pub x: Vec<f64>,
    /// Distance of each (y, x) label to the unsnapped centre, row-major.
    pub cent_distance: Vec<f64>,
    pub pixel_anchor: PixelAnchor,
    pub bbox: BoundingBox,
    pub attrs: CubeAttrs,
    /// Href per (band, time), band-major.
    assets: Vec<Option<String>>,
    data: Vec<f32>,
}

impl MiniCube {
    /// Number of values in a `bands × times × edge × edge` cube.
    ///
    /// Fails with `InvalidParameter` when the cube or one of its planes
    /// would exceed [`MAX_CUBE_VALUES`].
    pub fn check_size(bands: usize, times: usize, edge_pixels: u32) -> CuboResult<usize> {
        let n = edge_pixels as usize;
        let plane = n.checked_mul(n);
        let total = plane
            .and_then(|p| p.checked_mul(bands))
            .and_then(|v| v.checked_mul(times));
        match (plane, total) {
            (Some(plane), Some(total)) if plane <= MAX_CUBE_VALUES && total <= MAX_CUBE_VALUES => {
                Ok(total)
            }
            _ => Err(CuboError::invalid(
                "edge_size",
                format!(
                    "a {} x {} x {} x {} cube exceeds {} values",
                    bands, times, n, n, MAX_CUBE_VALUES
                ),
            )),
        }
    }

    /// Assemble an unloaded cube.
    ///
    /// Slices are sorted by time (ties by id, order kept otherwise). A band
    /// missing from a slice leaves that plane unloadable.
    pub fn assemble(
        geometry: &CubeGeometry,
        anchor: PixelAnchor,
        bands: Vec<String>,
        mut slices: Vec<TimeSlice>,
        attrs: CubeAttrs,
    ) -> CuboResult<Self> {
        let values = Self::check_size(bands.len(), slices.len(), geometry.edge_pixels)?;
        slices.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));

        let n = geometry.edge_pixels as usize;
        let bbox = geometry.bbox;
        let offset = anchor.offset();

        let x: Vec<f64> = (0..n)
            .map(|i| bbox.west + (i as f64 + offset) * geometry.resolution)
            .collect();
        let y: Vec<f64> = (0..n)
            .map(|j| bbox.north - (j as f64 + offset) * geometry.resolution_y)
            .collect();

        let cent_distance = y
            .iter()
            .flat_map(|&yy| x.iter().map(move |&xx| geometry.projected.distance_to(xx, yy)))
            .collect();

        let assets = bands
            .iter()
            .flat_map(|band| slices.iter().map(move |slice| slice.assets.get(band).cloned()))
            .collect();

        let times: Vec<DateTime<Utc>> = slices.iter().map(|s| s.time).collect();
        let item_ids = slices.into_iter().map(|s| s.id).collect();
        let data = vec![f32::NAN; values];

        Ok(Self {
            name: attrs.collection.clone(),
            bands,
            times,
            item_ids,
            y,
            x,
            cent_distance,
            pixel_anchor: anchor,
            bbox,
            attrs,
            assets,
            data,
        })
    }

    /// Sizes along `DIMS`.
    pub fn shape(&self) -> [usize; 4] {
        [self.bands.len(), self.times.len(), self.y.len(), self.x.len()]
    }

    pub fn dims(&self) -> [&'static str; 4] {
        DIMS
    }

    fn plane_len(&self) -> usize {
        self.y.len() * self.x.len()
    }

    fn plane_index(&self, band: usize, time: usize) -> usize {
        band * self.times.len() + time
    }

    /// Href of a (band, time) slice.
    pub fn asset(&self, band: usize, time: usize) -> Option<&str> {
        self.assets
            .get(self.plane_index(band, time))
            .and_then(|a| a.as_deref())
    }

    /// Value at an index, `None` when out of range.
    pub fn get(&self, band: usize, time: usize, y: usize, x: usize) -> Option<f32> {
        let [nb, nt, ny, nx] = self.shape();
        if band >= nb || time >= nt || y >= ny || x >= nx {
            return None;
        }
        let idx = self.plane_index(band, time) * self.plane_len() + y * nx + x;
        self.data.get(idx).copied()
    }

    /// Distance from the requested centre at (y, x).
    pub fn distance_at(&self, y: usize, x: usize) -> Option<f64> {
        if y >= self.y.len() || x >= self.x.len() {
            return None;
        }
        self.cent_distance.get(y * self.x.len() + x).copied()
    }

    /// All pixel data, band-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Index of a band by name.
    pub fn band_index(&self, band: &str) -> Option<usize> {
        self.bands.iter().position(|b| b == band)
    }

    /// Replace one (band, time) plane.
    pub fn set_plane(&mut self, band: usize, time: usize, values: Vec<f32>) -> CuboResult<()> {
        let plane = self.plane_len();
        if band >= self.bands.len() || time >= self.times.len() {
            return Err(CuboError::invalid(
                "plane",
                format!("({}, {}) is outside the cube", band, time),
            ));
        }
        if values.len() != plane {
            return Err(CuboError::invalid(
                "plane",
                format!("expected {} values, got {}", plane, values.len()),
            ));
        }
        let start = self.plane_index(band, time) * plane;
        self.data[start..start + plane].copy_from_slice(&values);
        Ok(())
    }

    /// The window every slice is read with.
    pub fn window(&self) -> RasterWindow {
        RasterWindow {
            bbox: self.bbox,
            resolution: self.attrs.resolution,
            width: self.x.len(),
            height: self.y.len(),
        }
    }

    /// Read every available slice, at most `max_concurrent` at a time.
    ///
    /// Slices without an asset stay NaN. The first read error aborts the
    /// load.
    pub async fn load(&mut self, reader: &dyn AssetReader, max_concurrent: usize) -> CuboResult<()> {
        let window = self.window();
        let jobs: Vec<(usize, usize, String)> = (0..self.bands.len())
            .flat_map(|b| (0..self.times.len()).map(move |t| (b, t)))
            .filter_map(|(b, t)| self.asset(b, t).map(|href| (b, t, href.to_string())))
            .collect();

        info!(slices = jobs.len(), "Loading cube slices");

        let results: Vec<CuboResult<(usize, usize, Vec<f32>)>> = stream::iter(jobs)
            .map(|(b, t, href)| async move {
                debug!(href = %href, "Reading window");
                reader
                    .read_window(&href, &window)
                    .await
                    .map(|values| (b, t, values))
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await;

        for result in results {
            let (b, t, values) = result?;
            self.set_plane(b, t, values)?;
        }
        Ok(())
    }

    /// Serializable description without pixel data.
    pub fn manifest(&self) -> CubeManifest {
        let assets = self
            .bands
            .iter()
            .enumerate()
            .map(|(b, band)| {
                let hrefs = (0..self.times.len())
                    .map(|t| self.asset(b, t).map(str::to_string))
                    .collect();
                (band.clone(), hrefs)
            })
            .collect();

        CubeManifest {
            name: self.name.clone(),
            dims: DIMS.iter().map(|d| d.to_string()).collect(),
            shape: self.shape().to_vec(),
            band: self.bands.clone(),
            time: self.times.clone(),
            item_ids: self.item_ids.clone(),
            y: self.y.clone(),
            x: self.x.clone(),
            pixel_anchor: self.pixel_anchor,
            bbox: self.bbox,
            attrs: self.attrs.clone(),
            assets,
        }
    }
}

/// JSON-friendly view of a cube's coordinates, attributes and assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeManifest {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub band: Vec<String>,
    pub time: Vec<DateTime<Utc>>,
    pub item_ids: Vec<String>,
    pub y: Vec<f64>,
    pub x: Vec<f64>,
    pub pixel_anchor: PixelAnchor,
    pub bbox: BoundingBox,
    pub attrs: CubeAttrs,
    /// Hrefs per band, one entry per time step.
    pub assets: BTreeMap<String, Vec<Option<String>>>,
}
