//! Shared test utilities for the field-monitor workspace.
//!
//! Provides pre-built field records, coordinates, and date ranges for
//! common test scenarios.
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;

pub use fixtures::*;
