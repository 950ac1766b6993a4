//! Rescale rank scores by how much of a name the query covers.

use crate::{RankSlot, RankedTriple, Score};

/// Replace each filled slot's base score with `base * len(query) / len(name)`.
///
/// Lengths are counted in Unicode scalar values. A fuzzy match guarantees the
/// name is at least as long as the query, so the ratio never exceeds `1.0`.
/// An empty name scores zero rather than dividing by zero.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use cityscout_core::{CityRecord, SlotPolicy, normalise, select_top3_by_population};
///
/// let origin = Coord { x: 0.0, y: 0.0 };
/// let mut triple = select_top3_by_population(
///     vec![CityRecord::new("Montreal", origin).with_population(1_780_000)],
///     SlotPolicy::Overwrite,
/// );
/// normalise("Mon", &mut triple);
/// assert_eq!(triple.top().map(|c| c.score.as_str()), Some("0.3750"));
/// ```
pub fn normalise(query: &str, triple: &mut RankedTriple) {
    let query_len = query.chars().count();
    for slot in RankSlot::ALL {
        if let Some(candidate) = triple.get_mut(slot) {
            let name_len = candidate.name.chars().count();
            candidate.score = Score::from_raw(scaled(slot.base_score(), query_len, name_len));
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "character counts are small and the ratio is a float by definition"
)]
fn scaled(base: f64, query_len: usize, name_len: usize) -> f64 {
    if name_len == 0 {
        return 0.0;
    }
    base * query_len as f64 / name_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CityRecord, SlotPolicy, select_top3_by_population};
    use geo::Coord;
    use rstest::rstest;

    fn triple_of(names: &[(&str, u64)]) -> RankedTriple {
        let records = names.iter().map(|(name, population)| {
            CityRecord::new(*name, Coord { x: 0.0, y: 0.0 }).with_population(*population)
        });
        select_top3_by_population(records, SlotPolicy::Overwrite)
    }

    fn scores(triple: &RankedTriple) -> Vec<String> {
        triple
            .iter()
            .map(|(_, candidate)| candidate.score.as_str().to_owned())
            .collect()
    }

    #[rstest]
    fn scales_each_slot_by_its_base() {
        let mut triple = triple_of(&[
            ("Montreal", 1_780_000),
            ("Montpelier", 7_500),
            ("Monticello", 1_200),
        ]);
        normalise("Mon", &mut triple);
        assert_eq!(scores(&triple), ["0.3750", "0.2700", "0.2400"]);
    }

    #[rstest]
    fn exact_match_keeps_base_score() {
        let mut triple = triple_of(&[("Laval", 1)]);
        normalise("Laval", &mut triple);
        assert_eq!(scores(&triple), ["1.0000"]);
    }

    #[rstest]
    fn counts_characters_not_bytes() {
        let mut triple = triple_of(&[("Québec", 1)]);
        normalise("Qué", &mut triple);
        assert_eq!(scores(&triple), ["0.5000"]);
    }

    #[rstest]
    fn empty_name_scores_zero() {
        assert!(scaled(1.0, 3, 0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(RankSlot::Top, 3, 8, "0.3750")]
    #[case(RankSlot::Second, 3, 10, "0.2700")]
    #[case(RankSlot::Third, 3, 10, "0.2400")]
    fn scales_ratio_by_slot_base(
        #[case] slot: RankSlot,
        #[case] query_len: usize,
        #[case] name_len: usize,
        #[case] expected: &str,
    ) {
        let score = Score::from_raw(scaled(slot.base_score(), query_len, name_len));
        assert_eq!(score.as_str(), expected);
    }

    #[rstest]
    fn empty_triple_is_untouched() {
        let mut triple = RankedTriple::default();
        normalise("Mon", &mut triple);
        assert!(triple.is_empty());
    }
}
