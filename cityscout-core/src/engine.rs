//! Orchestrates a single suggestion request.
//!
//! [`SuggestionEngine`] wires the pattern builder, an injected
//! [`CatalogReader`], the top-3 selectors and the score normaliser together.
//! It holds no per-request state, so one engine can serve concurrent requests
//! behind an `Arc`.

use geo::Coord;
use log::debug;
use thiserror::Error;

use crate::{
    CatalogError, CatalogFields, CatalogReader, Candidate, DistanceMetric, DistanceOrder,
    FuzzyPattern, GeodesicDistance, RankedTriple, Score, SlotPolicy, normalise,
    select_top3_by_distance, select_top3_by_population,
};

/// A validated suggestion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    /// Partial city name as typed by the caller.
    pub query: String,
    /// Reference point for distance ranking, `x = longitude`, `y = latitude`.
    pub reference: Option<Coord<f64>>,
}

impl SuggestionRequest {
    /// Request ranked by population.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reference: None,
        }
    }

    /// Rank by distance from `reference` instead of by population.
    #[must_use]
    pub const fn with_reference(mut self, reference: Coord<f64>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Ranking criterion implied by the request.
    #[must_use]
    pub const fn ranking_mode(&self) -> RankingMode {
        match self.reference {
            Some(reference) => RankingMode::Distance { reference },
            None => RankingMode::Population,
        }
    }
}

/// How candidates are ranked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingMode {
    /// Largest population first.
    Population,
    /// Ranked by distance from `reference`; see [`DistanceOrder`].
    Distance {
        /// Caller-supplied reference point.
        reference: Coord<f64>,
    },
}

impl RankingMode {
    /// Columns the catalog must return for this mode.
    #[must_use]
    pub const fn fields(self) -> CatalogFields {
        match self {
            Self::Population => CatalogFields::WithPopulation,
            Self::Distance { .. } => CatalogFields::LocationOnly,
        }
    }
}

/// Tunable ranking behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Which end of the distance range wins in distance mode.
    pub distance_order: DistanceOrder,
    /// Whether displaced slot occupants are dropped or demoted.
    pub slot_policy: SlotPolicy,
}

impl EngineConfig {
    /// Configuration with the compatible defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the distance order.
    #[must_use]
    pub const fn with_distance_order(mut self, order: DistanceOrder) -> Self {
        self.distance_order = order;
        self
    }

    /// Override the slot policy.
    #[must_use]
    pub const fn with_slot_policy(mut self, policy: SlotPolicy) -> Self {
        self.slot_policy = policy;
        self
    }
}

/// One row of the response.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Suggestion {
    /// City name.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Normalised relevance score.
    pub score: Score,
}

impl From<Candidate> for Suggestion {
    fn from(candidate: Candidate) -> Self {
        Self {
            name: candidate.name,
            latitude: candidate.location.y,
            longitude: candidate.location.x,
            score: candidate.score,
        }
    }
}

/// Errors from [`SuggestionEngine::suggest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestError {
    /// The query was empty.
    #[error("query must not be empty")]
    EmptyQuery,
    /// The catalog fetch failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Flatten a normalised triple and sort it by descending score.
///
/// The sort is stable, so equal scores keep slot order.
#[must_use]
pub fn assemble(triple: RankedTriple) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = triple
        .into_candidates()
        .into_iter()
        .map(Suggestion::from)
        .collect();
    suggestions.sort_by(|a, b| b.score.cmp(&a.score));
    suggestions
}

/// Produces ranked suggestions from a city catalog.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use cityscout_core::{
///     CatalogError, CatalogFields, CatalogReader, CityRecord, FuzzyPattern, SuggestionEngine,
///     SuggestionRequest,
/// };
///
/// struct Fixed(Vec<CityRecord>);
///
/// impl CatalogReader for Fixed {
///     fn fetch(
///         &self,
///         pattern: &FuzzyPattern,
///         fields: CatalogFields,
///     ) -> Result<Vec<CityRecord>, CatalogError> {
///         Ok(self
///             .0
///             .iter()
///             .filter(|city| pattern.is_match(&city.name))
///             .cloned()
///             .map(|city| fields.project(city))
///             .collect())
///     }
/// }
///
/// let origin = Coord { x: 0.0, y: 0.0 };
/// let engine = SuggestionEngine::new(Fixed(vec![
///     CityRecord::new("Montreal", origin).with_population(1_780_000),
///     CityRecord::new("Toronto", origin).with_population(2_700_000),
/// ]));
///
/// let suggestions = engine.suggest(&SuggestionRequest::new("mon"))?;
/// assert_eq!(suggestions.len(), 1);
/// assert_eq!(suggestions[0].name, "Montreal");
/// assert_eq!(suggestions[0].score.as_str(), "0.3750");
/// # Ok::<(), cityscout_core::SuggestError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SuggestionEngine<C, D = GeodesicDistance> {
    catalog: C,
    distance: D,
    config: EngineConfig,
}

impl<C> SuggestionEngine<C, GeodesicDistance>
where
    C: CatalogReader,
{
    /// Engine using geodesic distances and the default configuration.
    #[must_use]
    pub fn new(catalog: C) -> Self {
        Self::with_distance(catalog, GeodesicDistance)
    }
}

impl<C, D> SuggestionEngine<C, D>
where
    C: CatalogReader,
    D: DistanceMetric,
{
    /// Engine using a custom distance metric.
    #[must_use]
    pub fn with_distance(catalog: C, distance: D) -> Self {
        Self {
            catalog,
            distance,
            config: EngineConfig::default(),
        }
    }

    /// Replace the ranking configuration.
    #[must_use]
    pub const fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Active ranking configuration.
    #[must_use]
    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    /// The injected catalog.
    #[must_use]
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Rank up to three cities matching `request`.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::EmptyQuery`] for an empty query and
    /// [`SuggestError::Catalog`] when the fetch fails. No partial results are
    /// returned.
    pub fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>, SuggestError> {
        if request.query.is_empty() {
            return Err(SuggestError::EmptyQuery);
        }
        let pattern = FuzzyPattern::build(&request.query);
        let mode = request.ranking_mode();
        let records = self.catalog.fetch(&pattern, mode.fields())?;
        debug!(
            "pattern {:?} matched {} records ({mode:?})",
            pattern.as_str(),
            records.len()
        );

        let mut triple = match mode {
            RankingMode::Population => select_top3_by_population(records, self.config.slot_policy),
            RankingMode::Distance { reference } => select_top3_by_distance(
                reference,
                records,
                &self.distance,
                self.config.distance_order,
                self.config.slot_policy,
            ),
        };
        normalise(&request.query, &mut triple);
        Ok(assemble(triple))
    }
}
