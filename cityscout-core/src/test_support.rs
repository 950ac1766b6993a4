//! In-memory collaborators for unit and behaviour tests.

use std::sync::{Mutex, PoisonError};

use geo::Coord;

use crate::{CatalogError, CatalogFields, CatalogReader, CityRecord, DistanceMetric, FuzzyPattern};

/// In-memory `CatalogReader` implementation used in tests.
///
/// The catalog performs a linear scan in insertion order and records the
/// projection of the most recent fetch.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    cities: Vec<CityRecord>,
    last_fields: Mutex<Option<CatalogFields>>,
}

impl MemoryCatalog {
    /// Create a catalog from a collection of cities.
    #[must_use]
    pub fn with_cities<I>(cities: I) -> Self
    where
        I: IntoIterator<Item = CityRecord>,
    {
        Self {
            cities: cities.into_iter().collect(),
            last_fields: Mutex::new(None),
        }
    }

    /// Projection requested by the most recent fetch.
    #[must_use]
    pub fn last_fields(&self) -> Option<CatalogFields> {
        *self
            .last_fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogReader for MemoryCatalog {
    fn fetch(
        &self,
        pattern: &FuzzyPattern,
        fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError> {
        *self
            .last_fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(fields);
        Ok(self
            .cities
            .iter()
            .filter(|city| pattern.is_match(&city.name))
            .cloned()
            .map(|city| fields.project(city))
            .collect())
    }
}

/// `CatalogReader` that fails every fetch with a fixed error.
#[derive(Debug, Clone)]
pub struct FailingCatalog {
    error: CatalogError,
}

impl FailingCatalog {
    /// Fail with [`CatalogError::Unavailable`].
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error: CatalogError::Unavailable {
                message: message.into(),
            },
        }
    }

    /// Fail with [`CatalogError::Query`].
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self {
            error: CatalogError::Query {
                message: message.into(),
            },
        }
    }
}

impl CatalogReader for FailingCatalog {
    fn fetch(
        &self,
        _pattern: &FuzzyPattern,
        _fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError> {
        Err(self.error.clone())
    }
}

/// Euclidean distance in degrees, for predictable test geometry.
#[derive(Debug, Default, Copy, Clone)]
pub struct PlanarDistance;

impl DistanceMetric for PlanarDistance {
    #[expect(clippy::float_arithmetic, reason = "planar test metric")]
    fn distance_km(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
        (to.x - from.x).hypot(to.y - from.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn memory_catalog_filters_and_records_projection() {
        let catalog = MemoryCatalog::with_cities([
            CityRecord::new("Laval", Coord { x: -73.7, y: 45.6 }).with_population(438_000),
            CityRecord::new("Levis", Coord { x: -71.2, y: 46.8 }).with_population(149_000),
        ]);
        let found = catalog
            .fetch(&FuzzyPattern::build("lav"), CatalogFields::LocationOnly)
            .expect("fetch");
        assert_eq!(found.len(), 1);
        assert!(found.iter().all(|city| city.population.is_none()));
        assert_eq!(catalog.last_fields(), Some(CatalogFields::LocationOnly));
    }

    #[rstest]
    fn failing_catalog_returns_configured_error() {
        let catalog = FailingCatalog::query("syntax error");
        let err = catalog
            .fetch(&FuzzyPattern::build("x"), CatalogFields::WithPopulation)
            .expect_err("fetch should fail");
        assert!(matches!(err, CatalogError::Query { .. }));
    }

    #[rstest]
    fn planar_distance_is_euclidean() {
        let d = PlanarDistance.distance_km(Coord { x: 0.0, y: 0.0 }, Coord { x: 3.0, y: 4.0 });
        assert!((d - 5.0).abs() < 1e-12);
    }
}
