//! PostgreSQL persistence for farms, fields, scenes, and index readings.

pub mod auth;
pub mod catalog;

pub use auth::{is_authorized, OwnershipCheck};
pub use catalog::{Catalog, FieldRecord, NewReading, NewScene};
