//! Data access traits for the city catalog.
//!
//! The `CatalogReader` trait defines a read-only interface for retrieving
//! [`CityRecord`] values whose names satisfy a [`FuzzyPattern`]. The catalog
//! is injected into the engine rather than reached through a global, so tests
//! can swap in an in-memory implementation.

use thiserror::Error;

use crate::{CityRecord, FuzzyPattern};

/// Columns a fetch must return.
///
/// Population ranking needs the population figure; distance ranking does not,
/// and implementations should leave [`CityRecord::population`] empty for
/// [`CatalogFields::LocationOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFields {
    /// `name`, `latitude`, `longitude` and `population`.
    WithPopulation,
    /// `name`, `latitude` and `longitude`.
    LocationOnly,
}

impl CatalogFields {
    /// Whether the population column is part of the projection.
    #[must_use]
    pub const fn includes_population(self) -> bool {
        matches!(self, Self::WithPopulation)
    }

    /// Apply the projection to a fully-populated record.
    #[must_use]
    pub fn project(self, record: CityRecord) -> CityRecord {
        if self.includes_population() {
            record
        } else {
            record.without_population()
        }
    }
}

/// Errors from [`CatalogReader::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The backing store could not be reached or opened.
    #[error("city catalog is unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
    /// The store was reachable but the query failed.
    #[error("city catalog query failed: {message}")]
    Query {
        /// Description of the failure.
        message: String,
    },
    /// A stored row could not be converted into a [`CityRecord`].
    #[error("catalog row for {name:?} is invalid: {reason}")]
    InvalidRecord {
        /// Name column of the offending row.
        name: String,
        /// Why the row was rejected.
        reason: String,
    },
}

/// Read-only access to the city catalog.
///
/// Implementations return every record whose name matches `pattern`, in any
/// order, restricted to `fields`. Callers must not assume sortedness.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use cityscout_core::{CatalogError, CatalogFields, CatalogReader, CityRecord, FuzzyPattern};
///
/// struct MemoryCatalog {
///     cities: Vec<CityRecord>,
/// }
///
/// impl CatalogReader for MemoryCatalog {
///     fn fetch(
///         &self,
///         pattern: &FuzzyPattern,
///         fields: CatalogFields,
///     ) -> Result<Vec<CityRecord>, CatalogError> {
///         let regex = pattern.compile().map_err(|err| CatalogError::Query {
///             message: err.to_string(),
///         })?;
///         Ok(self
///             .cities
///             .iter()
///             .filter(|city| regex.is_match(&city.name))
///             .cloned()
///             .map(|city| fields.project(city))
///             .collect())
///     }
/// }
///
/// let catalog = MemoryCatalog {
///     cities: vec![CityRecord::new("Montreal", Coord { x: -73.6, y: 45.5 }).with_population(1)],
/// };
/// let found = catalog.fetch(&FuzzyPattern::build("mtl"), CatalogFields::LocationOnly)?;
/// assert_eq!(found.len(), 1);
/// assert!(found[0].population.is_none());
/// # Ok::<(), CatalogError>(())
/// ```
pub trait CatalogReader: Send + Sync {
    /// Return all records whose name satisfies `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the store cannot be reached or a row is
    /// unusable. Implementations must not return partial results.
    fn fetch(
        &self,
        pattern: &FuzzyPattern,
        fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    #[rstest]
    #[case(CatalogFields::WithPopulation, Some(5))]
    #[case(CatalogFields::LocationOnly, None)]
    fn projection_controls_population(
        #[case] fields: CatalogFields,
        #[case] expected: Option<u64>,
    ) {
        let record = CityRecord::new("Gatineau", Coord { x: -75.7, y: 45.5 }).with_population(5);
        assert_eq!(fields.project(record).population, expected);
    }
}
