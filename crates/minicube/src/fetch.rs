//! Imagery fetchers: turn a request and its geometry into a [`MiniCube`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use cubo_common::{CuboError, CuboResult};

use crate::cube::{CubeAttrs, MiniCube, TimeSlice};
use crate::request::{Backend, CubeRequest};
use crate::resolver::CubeGeometry;
use crate::signing::{is_planetary_computer, PlanetaryComputerSigner};
use crate::stac::{Item, SearchParams, StacClient, StacClientConfig};

/// Source of the imagery for a resolved cube.
#[async_trait]
pub trait ImageryFetcher: Send + Sync {
    async fn fetch(&self, request: &CubeRequest, geometry: &CubeGeometry) -> CuboResult<MiniCube>;
}

/// Resolve the request geometry and fetch its cube.
#[instrument(skip_all, fields(collection = %request.collection, lat = request.lat, lon = request.lon))]
pub async fn create(request: &CubeRequest, fetcher: &dyn ImageryFetcher) -> CuboResult<MiniCube> {
    let geometry = request.geometry()?;
    // Reject planes too large to hold before any search or download
    MiniCube::check_size(1, 1, geometry.edge_pixels)?;
    info!(
        epsg = geometry.epsg(),
        edge_pixels = geometry.edge_pixels,
        "Creating cube"
    );
    fetcher.fetch(request, &geometry).await
}

/// When asset hrefs get Planetary Computer SAS tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningPolicy {
    /// Sign only for the Planetary Computer catalog.
    #[default]
    Auto,
    Always,
    Never,
}

/// Fetches cubes from a STAC catalog.
#[derive(Debug)]
pub struct StacFetcher {
    client: StacClient,
    signer: PlanetaryComputerSigner,
    signing: SigningPolicy,
}

impl StacFetcher {
    pub fn new(config: StacClientConfig) -> CuboResult<Self> {
        let client = StacClient::new(config)?;
        let signer = PlanetaryComputerSigner::new(client.http().clone());
        Ok(Self {
            client,
            signer,
            signing: SigningPolicy::Auto,
        })
    }

    pub fn with_signer(mut self, signer: PlanetaryComputerSigner) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_signing(mut self, signing: SigningPolicy) -> Self {
        self.signing = signing;
        self
    }

    fn should_sign(&self, endpoint: &str) -> bool {
        match self.signing {
            SigningPolicy::Auto => is_planetary_computer(endpoint),
            SigningPolicy::Always => true,
            SigningPolicy::Never => false,
        }
    }
}

#[async_trait]
impl ImageryFetcher for StacFetcher {
    async fn fetch(&self, request: &CubeRequest, geometry: &CubeGeometry) -> CuboResult<MiniCube> {
        let endpoint = request.backend.stac_endpoint().ok_or_else(|| {
            CuboError::invalid("backend", "the STAC fetcher needs a STAC endpoint")
        })?;

        let params = SearchParams {
            collections: vec![request.collection.clone()],
            datetime: request.dates.to_interval(),
            intersects: geometry.footprint.to_geojson(),
            extra: request.query.clone(),
            max_items: request.max_items,
        };

        let mut items = self.client.search(endpoint, &params).await?;
        if items.is_empty() {
            return Err(CuboError::Catalog(format!(
                "no items in '{}' between {} and {}",
                request.collection, request.dates.start, request.dates.end
            )));
        }

        if self.should_sign(endpoint) {
            self.signer.sign_items(&mut items, &request.collection).await?;
        }

        let attrs = cube_attrs(request, geometry, Some(endpoint.to_string()));
        stack_items(request, geometry, items, attrs)
    }
}

/// Stack STAC items into an unloaded cube.
///
/// Bands are the requested ones, or the sorted union of every item's data
/// assets. Items without an acquisition time are dropped.
pub fn stack_items(
    request: &CubeRequest,
    geometry: &CubeGeometry,
    items: Vec<Item>,
    attrs: CubeAttrs,
) -> CuboResult<MiniCube> {
    let bands: Vec<String> = match &request.bands {
        Some(bands) => bands.clone(),
        None => items
            .iter()
            .flat_map(|item| item.data_asset_names())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let slices = items
        .into_iter()
        .filter_map(|item| {
            let Some(time) = item.datetime() else {
                warn!(item = %item.id, "Item has no datetime, skipping");
                return None;
            };
            let assets = item
                .assets
                .into_iter()
                .filter(|(name, _)| bands.contains(name))
                .map(|(name, asset)| (name, asset.href))
                .collect();
            Some(TimeSlice {
                time,
                id: item.id,
                assets,
            })
        })
        .collect();

    MiniCube::assemble(geometry, request.pixel_anchor, bands, slices, attrs)
}

pub(crate) fn cube_attrs(
    request: &CubeRequest,
    geometry: &CubeGeometry,
    stac: Option<String>,
) -> CubeAttrs {
    CubeAttrs {
        collection: request.collection.clone(),
        stac,
        epsg: geometry.epsg(),
        resolution: geometry.resolution,
        edge_size: geometry.edge_pixels,
        central_lat: geometry.point.lat,
        central_lon: geometry.point.lon,
        central_x: geometry.projected.x,
        central_y: geometry.projected.y,
        time_coverage_start: request.dates.start.to_string(),
        time_coverage_end: request.dates.end.to_string(),
        image_ids: Vec::new(),
    }
}

/// Dispatches requests to the fetcher of their backend.
pub struct CubeClient {
    stac: StacFetcher,
    cloud: Option<Arc<dyn ImageryFetcher>>,
}

impl CubeClient {
    pub fn new(stac: StacFetcher) -> Self {
        Self { stac, cloud: None }
    }

    /// Fetcher used for `Backend::CloudCollection` requests.
    pub fn with_cloud(mut self, cloud: Arc<dyn ImageryFetcher>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub async fn create(&self, request: &CubeRequest) -> CuboResult<MiniCube> {
        create(request, self).await
    }
}

#[async_trait]
impl ImageryFetcher for CubeClient {
    async fn fetch(&self, request: &CubeRequest, geometry: &CubeGeometry) -> CuboResult<MiniCube> {
        match &request.backend {
            Backend::Stac { .. } => self.stac.fetch(request, geometry).await,
            Backend::CloudCollection => match &self.cloud {
                Some(cloud) => cloud.fetch(request, geometry).await,
                None => Err(CuboError::Collection(
                    "no cloud collection source configured".to_string(),
                )),
            },
        }
    }
}
