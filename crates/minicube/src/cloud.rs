//! Cubes from cloud-hosted image collections.
//!
//! The collection is reached through a [`CollectionSource`]. Unlike the
//! catalog path, the cube is aligned to the collection's own geotransform
//! and pixel data is downloaded eagerly, one patch per image.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cubo_common::{BoundingBox, CuboError, CuboResult, DateRange, GeoPoint, ProjectedPoint};

use crate::cube::{MiniCube, TimeSlice};
use crate::fetch::{cube_attrs, ImageryFetcher};
use crate::request::CubeRequest;
use crate::resolver::{BoundingBoxResolver, CubeGeometry};

/// Default number of concurrent patch downloads.
pub const DEFAULT_MAX_WORKERS: usize = 16;

/// CRS and affine geotransform of a collection.
///
/// `transform` is `[scale_x, shear_x, translate_x, shear_y, scale_y,
/// translate_y]`; `scale_y` is negative for north-up grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectionProjection {
    pub epsg: u32,
    pub transform: [f64; 6],
}

impl CollectionProjection {
    pub fn scale(&self) -> (f64, f64) {
        (self.transform[0], self.transform[4])
    }

    /// Snap a projected point onto the nearest grid node.
    pub fn snap(&self, point: &ProjectedPoint) -> ProjectedPoint {
        let (sx, sy) = self.scale();
        let (tx, ty) = (self.transform[2], self.transform[5]);
        ProjectedPoint::new(
            tx + ((point.x - tx) / sx).round() * sx,
            ty + ((point.y - ty) / sy).round() * sy,
            self.epsg,
        )
    }
}

/// One image of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub time: DateTime<Utc>,
}

/// A pixel window to download from one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    /// Upper-left corner.
    pub origin: (f64, f64),
    pub scale: (f64, f64),
    pub width: usize,
    pub height: usize,
    pub bands: Vec<String>,
    pub epsg: u32,
}

impl PatchRequest {
    /// Values expected back: `bands × height × width`.
    pub fn len(&self) -> usize {
        self.bands.len() * self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Access to a hosted image collection.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// CRS and geotransform of the collection around `point`.
    async fn projection(
        &self,
        collection: &str,
        point: &GeoPoint,
        dates: &DateRange,
        bands: &[String],
    ) -> CuboResult<CollectionProjection>;

    /// Images covering `center` within `dates`.
    async fn images(
        &self,
        collection: &str,
        center: &ProjectedPoint,
        dates: &DateRange,
        bands: &[String],
    ) -> CuboResult<Vec<ImageRef>>;

    /// Pixel values of one image, band-major and row-major from the
    /// upper-left corner.
    async fn patch(&self, image_id: &str, request: &PatchRequest) -> CuboResult<Vec<f32>>;
}

/// Fetches cubes from a [`CollectionSource`].
pub struct CloudCollectionFetcher {
    source: Arc<dyn CollectionSource>,
    max_workers: usize,
}

impl CloudCollectionFetcher {
    pub fn new(source: Arc<dyn CollectionSource>) -> Self {
        Self {
            source,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Cube geometry on the collection grid.
    fn align(
        &self,
        request: &CubeRequest,
        point: GeoPoint,
        grid: &CollectionProjection,
    ) -> CuboResult<CubeGeometry> {
        let (sx, sy) = grid.scale();
        if !(sx.is_finite() && sy.is_finite()) || sx == 0.0 || sy == 0.0 {
            return Err(CuboError::Collection(format!(
                "degenerate geotransform {:?}",
                grid.transform
            )));
        }

        let resolution = sx.abs();
        let edge_pixels = BoundingBoxResolver::new().edge_pixels(
            resolution,
            request.edge_size,
            &request.edge_unit,
        )?;

        let projected = projection::to_epsg(&point, grid.epsg)?;
        let center = grid.snap(&projected);

        let half = (edge_pixels / 2) as f64;
        let origin_x = center.x - half * sx;
        let origin_y = center.y - half * sy;
        let extent_x = edge_pixels as f64 * sx;
        let extent_y = edge_pixels as f64 * sy;
        let bbox = BoundingBox::new(
            origin_x.min(origin_x + extent_x),
            origin_y.min(origin_y + extent_y),
            origin_x.max(origin_x + extent_x),
            origin_y.max(origin_y + extent_y),
            grid.epsg,
        );
        let footprint = projection::footprint(&bbox)?;

        Ok(CubeGeometry {
            point,
            projected,
            center,
            edge_pixels,
            resolution,
            resolution_y: sy.abs(),
            bbox,
            footprint,
        })
    }
}

#[async_trait]
impl ImageryFetcher for CloudCollectionFetcher {
    async fn fetch(&self, request: &CubeRequest, geometry: &CubeGeometry) -> CuboResult<MiniCube> {
        let bands = request
            .bands
            .clone()
            .filter(|bands| !bands.is_empty())
            .ok_or_else(|| CuboError::invalid("bands", "cloud collections need explicit bands"))?;

        let grid = self
            .source
            .projection(&request.collection, &geometry.point, &request.dates, &bands)
            .await?;
        let aligned = self.align(request, geometry.point, &grid)?;

        let images = self
            .source
            .images(&request.collection, &aligned.center, &request.dates, &bands)
            .await?;
        MiniCube::check_size(bands.len(), images.len(), aligned.edge_pixels)?;
        info!(
            images = images.len(),
            epsg = grid.epsg,
            edge_pixels = aligned.edge_pixels,
            "Downloading patches"
        );

        let (sx, sy) = grid.scale();
        let half = (aligned.edge_pixels / 2) as f64;
        let patch = PatchRequest {
            origin: (aligned.center.x - half * sx, aligned.center.y - half * sy),
            scale: (sx, sy),
            width: aligned.edge_pixels as usize,
            height: aligned.edge_pixels as usize,
            bands: bands.clone(),
            epsg: grid.epsg,
        };

        let patch_ref = &patch;
        let source = &self.source;
        let mut downloaded: Vec<(ImageRef, Vec<f32>)> = stream::iter(images)
            .map(|image| async move {
                let result = source.patch(&image.id, patch_ref).await.and_then(|values| {
                    if values.len() == patch_ref.len() {
                        Ok(values)
                    } else {
                        Err(CuboError::Collection(format!(
                            "expected {} values, got {}",
                            patch_ref.len(),
                            values.len()
                        )))
                    }
                });
                (image, result)
            })
            .buffer_unordered(self.max_workers)
            .filter_map(|(image, result)| async move {
                match result {
                    Ok(values) => {
                        debug!(image = %image.id, "Patch downloaded");
                        Some((image, values))
                    }
                    Err(e) => {
                        warn!(image = %image.id, error = %e, "Patch download failed, skipping");
                        metrics::counter!("cubo_patch_failures_total").increment(1);
                        None
                    }
                }
            })
            .collect()
            .await;

        // Same order as assemble, so time index i is downloaded[i]
        downloaded.sort_by(|(a, _), (b, _)| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));

        let slices = downloaded
            .iter()
            .map(|(image, _)| TimeSlice {
                time: image.time,
                id: image.id.clone(),
                assets: Default::default(),
            })
            .collect();

        let attrs = cube_attrs(request, &aligned, None);
        let mut cube = MiniCube::assemble(&aligned, request.pixel_anchor, bands, slices, attrs)?;
        cube.attrs.image_ids = cube.item_ids.clone();

        let plane = patch.width * patch.height;
        for (t, (_, values)) in downloaded.into_iter().enumerate() {
            for (b, chunk) in values.chunks(plane).enumerate() {
                cube.set_plane(b, t, chunk.to_vec())?;
            }
        }

        Ok(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_geotransform() {
        let projection = CollectionProjection {
            epsg: 32632,
            transform: [10.0, 0.0, 499_980.0, 0.0, -10.0, 5_600_040.0],
        };
        let snapped = projection.snap(&ProjectedPoint::new(571_666.4, 5_539_109.8, 32632));
        assert_eq!(snapped.x, 571_670.0);
        assert_eq!(snapped.y, 5_539_110.0);

        // Grid offset by 5 m
        let projection = CollectionProjection {
            epsg: 32632,
            transform: [10.0, 0.0, 5.0, 0.0, -10.0, 5.0],
        };
        let snapped = projection.snap(&ProjectedPoint::new(571_666.4, 5_539_109.8, 32632));
        assert_eq!(snapped.x, 571_665.0);
        assert_eq!(snapped.y, 5_539_105.0);
    }

    #[test]
    fn test_patch_len() {
        let patch = PatchRequest {
            origin: (0.0, 0.0),
            scale: (10.0, -10.0),
            width: 4,
            height: 4,
            bands: vec!["B4".into(), "B3".into()],
            epsg: 32632,
        };
        assert_eq!(patch.len(), 32);
    }
}
