//! Earth Observation mini-cubes around a point.
//!
//! A mini-cube is a small `band × time × y × x` raster stack centred on a
//! geographic point. This crate computes the pixel-aligned UTM bounding box
//! of such a cube ([`BoundingBoxResolver`]) and assembles the cube from a
//! STAC catalog ([`StacFetcher`]) or a hosted image collection
//! ([`CloudCollectionFetcher`]).
//!
//! ```ignore
//! use minicube::{create, CubeRequest, StacFetcher, StacClientConfig};
//! use cubo_common::DateRange;
//!
//! let request = CubeRequest::new(50.0, 10.0, "sentinel-2-l2a",
//!     DateRange::parse("2021-06-01", "2021-06-10")?)
//!     .with_bands(["B02", "B03", "B04"]);
//! let fetcher = StacFetcher::new(StacClientConfig::default())?;
//! let cube = create(&request, &fetcher).await?;
//! ```

pub mod cloud;
pub mod cube;
pub mod fetch;
pub mod request;
pub mod resolver;
pub mod signing;
pub mod stac;

pub use cloud::{
    CloudCollectionFetcher, CollectionProjection, CollectionSource, ImageRef, PatchRequest,
};
pub use cube::{AssetReader, CubeAttrs, CubeManifest, MiniCube, RasterWindow, TimeSlice, DIMS};
pub use fetch::{create, stack_items, CubeClient, ImageryFetcher, SigningPolicy, StacFetcher};
pub use request::{Backend, CubeRequest, PixelAnchor, PLANETARY_COMPUTER_STAC};
pub use resolver::{BoundingBoxResolver, CubeGeometry, MIN_EDGE_PIXELS};
pub use signing::PlanetaryComputerSigner;
pub use stac::{StacClient, StacClientConfig};

// Re-export the shared types callers need to build requests
pub use cubo_common::{BoundingBox, CuboError, CuboResult, DateRange, EdgeUnit, GeoPoint, UnitRegistry};
