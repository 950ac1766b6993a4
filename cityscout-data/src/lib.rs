//! Storage adapters for the CityScout catalog.
//!
//! Responsibilities:
//! - Serve [`CatalogReader`](cityscout_core::CatalogReader) fetches from a
//!   SQLite database.
//! - Import city lists from JSON into that database.
//!
//! Boundaries:
//! - Do not encode ranking rules (live in `cityscout-core`).
//! - Keep connections short-lived; no state outlives a fetch.

#![forbid(unsafe_code)]

mod catalog;
mod import;
mod schema;

pub use catalog::{SqliteCatalog, SqliteCatalogError};
pub use import::{LoadCitiesError, PersistCitiesError, load_city_file, persist_cities_to_sqlite};
