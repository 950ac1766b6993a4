//! Typed parsing of the `q` query parameter.
//!
//! `q` carries a JSON object such as
//! `{"name": "mon", "lat": "45.5", "long": "-73.6"}`. It is decoded into a
//! [`SuggestionRequest`] at the boundary so malformed input never reaches the
//! engine.

use cityscout_core::SuggestionRequest;
use geo::Coord;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

const MAX_LATITUDE: f64 = 90.0;
const MAX_LONGITUDE: f64 = 180.0;

/// Errors raised while decoding `q`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A required field was absent or empty.
    #[error("parameter '{parameter}' is required for this call")]
    MissingRequiredParameter {
        /// Name of the missing field.
        parameter: &'static str,
    },
    /// `q` was not a JSON object of the expected shape.
    #[error("query payload is not valid JSON: {source}")]
    MalformedQueryPayload {
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// An optional field was present but unusable.
    #[error("parameter '{parameter}' must be a number within range, got {value:?}")]
    InvalidOptionalParameter {
        /// Name of the offending field.
        parameter: &'static str,
        /// Value as supplied.
        value: String,
    },
}

/// A number written either as a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    fn parse(self, parameter: &'static str, limit: f64) -> Result<f64, QueryError> {
        let parsed = match &self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
        };
        parsed
            .filter(|value| value.is_finite() && value.abs() <= limit)
            .ok_or_else(|| QueryError::InvalidOptionalParameter {
                parameter,
                value: match self {
                    Self::Number(value) => value.to_string(),
                    Self::Text(text) => text,
                },
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<NumericField>,
    #[serde(default)]
    long: Option<NumericField>,
}

/// Decode the JSON carried by `q`.
///
/// Distance ranking is requested only when both `lat` and `long` are present;
/// a lone coordinate falls back to population ranking.
///
/// # Errors
///
/// Returns [`QueryError`] when the JSON is malformed, `name` is missing or
/// empty, or a coordinate is not a finite in-range number.
///
/// # Examples
///
/// ```
/// use cityscout_server::parse_query;
///
/// let request = parse_query(r#"{"name": "mon", "lat": "45.5", "long": "-73.6"}"#)?;
/// assert_eq!(request.query, "mon");
/// assert!(request.reference.is_some());
/// # Ok::<(), cityscout_server::QueryError>(())
/// ```
pub fn parse_query(raw: &str) -> Result<SuggestionRequest, QueryError> {
    let query: RawQuery = serde_json::from_str(raw)
        .map_err(|source| QueryError::MalformedQueryPayload { source })?;

    let name = query
        .name
        .filter(|name| !name.is_empty())
        .ok_or(QueryError::MissingRequiredParameter { parameter: "name" })?;
    let lat = query
        .lat
        .map(|lat| lat.parse("lat", MAX_LATITUDE))
        .transpose()?;
    let long = query
        .long
        .map(|long| long.parse("long", MAX_LONGITUDE))
        .transpose()?;

    let request = SuggestionRequest::new(name);
    Ok(match (lat, long) {
        (Some(y), Some(x)) => request.with_reference(Coord { x, y }),
        (None, None) => request,
        (lat, long) => {
            debug!("ignoring partial coordinates lat={lat:?} long={long:?}");
            request
        }
    })
}
