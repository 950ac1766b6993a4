//! Core suggestion engine for CityScout.
//!
//! A query flows through four stages:
//!
//! 1. [`FuzzyPattern::build`] turns the partial name into an in-order
//!    character matcher.
//! 2. A [`CatalogReader`] returns every city whose name matches.
//! 3. [`select_top3_by_population`] or [`select_top3_by_distance`] keeps at
//!    most three candidates in fixed rank slots.
//! 4. [`normalise`] rescales each slot's base score by how much of the name
//!    the query covers, and [`assemble`] sorts the result.
//!
//! [`SuggestionEngine`] runs the whole pipeline for one request. Storage and
//! transport live in sibling crates; this crate only defines the seams.

#![forbid(unsafe_code)]

mod catalog;
mod city;
mod distance;
mod engine;
mod normalise;
mod pattern;
mod ranking;
mod score;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{CatalogError, CatalogFields, CatalogReader};
pub use city::CityRecord;
pub use distance::{DistanceMetric, GeodesicDistance};
pub use engine::{
    EngineConfig, RankingMode, SuggestError, Suggestion, SuggestionEngine, SuggestionRequest,
    assemble,
};
pub use normalise::normalise;
pub use pattern::{FuzzyPattern, title_case};
pub use ranking::{
    Candidate, DistanceOrder, ParseRankingOptionError, RANK_BY_FARTHEST, RankSlot, RankedTriple,
    SlotPolicy, select_top3_by_distance, select_top3_by_population,
};
pub use score::{SCORE_DECIMALS, Score};
