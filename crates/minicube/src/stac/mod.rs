//! STAC catalog access.

pub mod client;
pub mod types;

pub use client::{SearchParams, StacClient, StacClientConfig};
pub use types::{Asset, Item, ItemCollection, Link};
