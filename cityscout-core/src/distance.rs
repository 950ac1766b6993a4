//! Great-circle distances between coordinates.
//!
//! The ranking engine treats distance as a pure function of two points. The
//! [`DistanceMetric`] trait lets tests substitute a planar metric; the
//! production metric is [`GeodesicDistance`].

use geo::{Coord, Distance, Geodesic, Point};

const METRES_PER_KILOMETRE: f64 = 1_000.0;

/// Compute the distance between two WGS84 coordinates.
///
/// Implementations must be pure and thread-safe. Units only need to be
/// consistent across calls; the provided metric returns kilometres.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use cityscout_core::DistanceMetric;
///
/// struct Manhattan;
///
/// impl DistanceMetric for Manhattan {
///     fn distance_km(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
///         (from.x - to.x).abs() + (from.y - to.y).abs()
///     }
/// }
///
/// let d = Manhattan.distance_km(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 2.0 });
/// assert_eq!(d, 3.0);
/// ```
pub trait DistanceMetric: Send + Sync {
    /// Distance from `from` to `to`.
    fn distance_km(&self, from: Coord<f64>, to: Coord<f64>) -> f64;
}

/// Geodesic distance on the WGS84 ellipsoid.
///
/// Uses Karney's algorithm via [`geo::Geodesic`], which converges for all
/// point pairs including near-antipodal ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeodesicDistance;

impl DistanceMetric for GeodesicDistance {
    #[expect(
        clippy::float_arithmetic,
        reason = "converting metres to kilometres"
    )]
    fn distance_km(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
        Geodesic.distance(Point::from(from), Point::from(to)) / METRES_PER_KILOMETRE
    }
}
