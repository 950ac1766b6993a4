//! Facade crate for the cityscout suggestion engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite catalog
//! and HTTP server behind feature flags.

#![forbid(unsafe_code)]

pub use cityscout_core::{
    CatalogError, CatalogFields, CatalogReader, CityRecord, DistanceMetric, DistanceOrder,
    EngineConfig, FuzzyPattern, GeodesicDistance, Score, SlotPolicy, SuggestError, Suggestion,
    SuggestionEngine, SuggestionRequest,
};

#[cfg(feature = "store-sqlite")]
pub use cityscout_data::{SqliteCatalog, SqliteCatalogError, load_city_file, persist_cities_to_sqlite};

#[cfg(feature = "server")]
pub use cityscout_server::{HttpServer, HttpServerConfig, Router, parse_query};
