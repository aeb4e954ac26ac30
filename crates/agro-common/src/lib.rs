//! Common types and utilities shared across all field-monitor services.

pub mod error;
pub mod geo;
pub mod index;
pub mod time;

pub use error::{AgroError, AgroResult};
pub use geo::{BoundingBox, Coordinates};
pub use index::{IndexKind, Observation, Provenance};
pub use time::DateRange;
