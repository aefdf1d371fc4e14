//! Common types and utilities shared across the cubo crates.

pub mod bbox;
pub mod error;
pub mod point;
pub mod time;
pub mod units;

pub use bbox::{BoundingBox, GeoPolygon};
pub use error::{CuboError, CuboResult};
pub use point::{GeoPoint, ProjectedPoint};
pub use time::DateRange;
pub use units::{EdgeUnit, UnitRegistry};
