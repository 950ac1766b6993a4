//! City records as stored in the catalog.

use geo::Coord;

/// A city row read from the catalog.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
/// `population` is only populated when the catalog was asked for it, see
/// [`CatalogFields`](crate::CatalogFields).
///
/// # Examples
/// ```
/// use geo::Coord;
/// use cityscout_core::CityRecord;
///
/// let city = CityRecord::new("Montreal", Coord { x: -73.58781, y: 45.50884 })
///     .with_population(1_780_000);
///
/// assert_eq!(city.name, "Montreal");
/// assert_eq!(city.latitude(), 45.50884);
/// assert_eq!(city.population, Some(1_780_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    /// Display name, matched case-sensitively against the fuzzy pattern.
    pub name: String,
    /// Geospatial position.
    pub location: Coord<f64>,
    /// Number of inhabitants, when known and requested.
    pub population: Option<u64>,
}

impl CityRecord {
    /// Construct a `CityRecord` without population data.
    #[must_use]
    pub fn new(name: impl Into<String>, location: Coord<f64>) -> Self {
        Self {
            name: name.into(),
            location,
            population: None,
        }
    }

    /// Attach a population figure.
    #[must_use]
    pub const fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }

    /// Drop the population so the record matches a location-only projection.
    #[must_use]
    pub const fn without_population(mut self) -> Self {
        self.population = None;
        self
    }
}
