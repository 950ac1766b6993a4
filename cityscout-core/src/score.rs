//! Fixed-point relevance scores.

use std::cmp::Ordering;
use std::fmt;

/// Number of decimal places in a rendered score.
pub const SCORE_DECIMALS: usize = 4;

/// A relevance score rendered to four decimal places.
///
/// The rendered string is what callers see (`"0.4286"`); ordering and
/// comparisons use the numeric value of that string, so sorting never falls
/// back to lexical order.
///
/// # Examples
///
/// ```
/// use cityscout_core::Score;
///
/// let score = Score::from_raw(3.0 / 7.0);
/// assert_eq!(score.as_str(), "0.4286");
/// assert_eq!(score.value(), 0.4286);
/// assert!(Score::from_raw(0.27) > Score::from_raw(0.24));
/// ```
#[derive(Debug, Clone)]
pub struct Score {
    value: f64,
    rendered: String,
}

impl Score {
    /// Round `raw` to [`SCORE_DECIMALS`] places.
    #[must_use]
    pub fn from_raw(raw: f64) -> Self {
        let rendered = format!("{raw:.SCORE_DECIMALS$}");
        let value = rendered.parse().unwrap_or(raw);
        Self { value, rendered }
    }

    /// Numeric value of the rendered score.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// The fixed-point rendering.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.value.total_cmp(&other.value) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Score {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, "1.0000")]
    #[case(0.5, "0.5000")]
    #[case(0.27, "0.2700")]
    #[case(0.123_456, "0.1235")]
    #[case(0.0, "0.0000")]
    fn renders_four_decimals(#[case] raw: f64, #[case] expected: &str) {
        assert_eq!(Score::from_raw(raw).as_str(), expected);
    }

    #[rstest]
    fn orders_by_numeric_value() {
        let mut scores = vec![
            Score::from_raw(0.095),
            Score::from_raw(1.0),
            Score::from_raw(0.9),
        ];
        scores.sort();
        let rendered: Vec<_> = scores.iter().map(Score::as_str).collect();
        assert_eq!(rendered, ["0.0950", "0.9000", "1.0000"]);
    }

    #[rstest]
    fn equality_uses_rounded_value() {
        assert_eq!(Score::from_raw(0.270_01), Score::from_raw(0.27));
    }
}
