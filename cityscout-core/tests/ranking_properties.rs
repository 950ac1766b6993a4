//! Property-based tests for the ranking pipeline.
//!
//! # Invariants tested
//!
//! - **Fuzzy match:** every selected name contains the title-cased query's
//!   characters in order.
//! - **Population order:** with cascading slots the filled slots are
//!   non-increasing in population.
//! - **Farthest distance:** the top slot holds the largest distance.
//! - **Distance slots:** with cascading slots the filled slots hold the three
//!   largest (farthest) or smallest (nearest) distances, in rank order.
//! - **Score bounds:** `0 < score <= base` with exactly four decimals.
//! - **Sort order:** assembled suggestions are non-increasing in score.
//! - **Idempotence:** the same request yields the same output.

use geo::Coord;
use proptest::prelude::*;

use cityscout_core::{
    CatalogError, CatalogFields, CatalogReader, CityRecord, DistanceMetric, DistanceOrder,
    EngineConfig, FuzzyPattern, RankSlot, SlotPolicy, SuggestionEngine, SuggestionRequest,
    normalise, select_top3_by_distance, select_top3_by_population,
};

struct VecCatalog(Vec<CityRecord>);

impl CatalogReader for VecCatalog {
    fn fetch(
        &self,
        pattern: &FuzzyPattern,
        fields: CatalogFields,
    ) -> Result<Vec<CityRecord>, CatalogError> {
        Ok(self
            .0
            .iter()
            .filter(|city| pattern.is_match(&city.name))
            .cloned()
            .map(|city| fields.project(city))
            .collect())
    }
}

struct AxisDistance;

impl DistanceMetric for AxisDistance {
    #[expect(clippy::float_arithmetic, reason = "planar test metric")]
    fn distance_km(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
        (to.x - from.x).abs()
    }
}

fn city_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{0,11}( [A-Z][a-z]{1,8})?"
}

fn populated_cities() -> impl Strategy<Value = Vec<CityRecord>> {
    // The numeric suffix keeps names unique without affecting the match.
    prop::collection::vec((city_name(), 0_u64..5_000_000), 0..24).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(index, (name, population))| {
                CityRecord::new(format!("{name} {index}"), Coord { x: 0.0, y: 0.0 })
                    .with_population(population)
            })
            .collect()
    })
}

fn placed_cities() -> impl Strategy<Value = Vec<CityRecord>> {
    prop::collection::vec((city_name(), -180.0_f64..180.0), 0..24).prop_map(|rows| {
        rows.into_iter()
            .map(|(name, x)| CityRecord::new(name, Coord { x, y: 0.0 }))
            .collect()
    })
}

fn query() -> impl Strategy<Value = String> {
    "[a-z]{1,3}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn selected_names_satisfy_pattern(cities in populated_cities(), q in query()) {
        let pattern = FuzzyPattern::build(&q);
        let engine = SuggestionEngine::new(VecCatalog(cities));
        let suggestions = engine
            .suggest(&SuggestionRequest::new(q.as_str()))
            .expect("in-memory catalog never fails");
        for suggestion in &suggestions {
            prop_assert!(
                pattern.is_match(&suggestion.name),
                "{} does not contain {:?} in order",
                suggestion.name,
                pattern.title_cased()
            );
        }
    }

    #[test]
    fn cascading_slots_are_ordered_by_population(cities in populated_cities()) {
        let triple = select_top3_by_population(cities.clone(), SlotPolicy::Cascade);
        let population_of = |name: &str| {
            cities
                .iter()
                .filter(|city| city.name == name)
                .filter_map(|city| city.population)
                .max()
        };
        let populations: Vec<_> = triple
            .iter()
            .map(|(_, candidate)| population_of(&candidate.name))
            .collect();
        prop_assert!(populations.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn overwrite_top_holds_the_maximum(cities in populated_cities()) {
        let triple = select_top3_by_population(cities.clone(), SlotPolicy::Overwrite);
        let max = cities.iter().filter_map(|city| city.population).max();
        let top = triple.top().map(|candidate| {
            cities
                .iter()
                .filter(|city| city.name == candidate.name)
                .filter_map(|city| city.population)
                .max()
        });
        prop_assert_eq!(top.flatten(), max);
    }

    #[test]
    fn farthest_top_holds_largest_distance(cities in placed_cities()) {
        let reference = Coord { x: 0.0, y: 0.0 };
        let triple = select_top3_by_distance(
            reference,
            cities.clone(),
            &AxisDistance,
            DistanceOrder::Farthest,
            SlotPolicy::Overwrite,
        );
        let largest = cities
            .iter()
            .map(|city| AxisDistance.distance_km(reference, city.location))
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.max(d))));
        let top = triple
            .top()
            .map(|candidate| AxisDistance.distance_km(reference, candidate.location));
        prop_assert_eq!(top, largest);
    }

    #[test]
    fn cascading_slots_hold_the_three_best_distances(
        cities in placed_cities(),
        nearest in any::<bool>(),
    ) {
        let reference = Coord { x: 0.0, y: 0.0 };
        let order = if nearest { DistanceOrder::Nearest } else { DistanceOrder::Farthest };
        let triple = select_top3_by_distance(
            reference,
            cities.clone(),
            &AxisDistance,
            order,
            SlotPolicy::Cascade,
        );
        let mut expected: Vec<f64> = cities
            .iter()
            .map(|city| AxisDistance.distance_km(reference, city.location))
            .collect();
        expected.sort_by(f64::total_cmp);
        if !nearest {
            expected.reverse();
        }
        expected.truncate(3);
        let selected: Vec<f64> = triple
            .iter()
            .map(|(_, candidate)| AxisDistance.distance_km(reference, candidate.location))
            .collect();
        prop_assert_eq!(selected, expected);
    }

    #[test]
    fn scores_stay_within_slot_base(cities in populated_cities(), q in query()) {
        let pattern = FuzzyPattern::build(&q);
        let matched: Vec<_> = cities
            .into_iter()
            .filter(|city| pattern.is_match(&city.name))
            .collect();
        let mut triple = select_top3_by_population(matched, SlotPolicy::Cascade);
        normalise(&q, &mut triple);
        for (slot, candidate) in triple.iter() {
            let value = candidate.score.value();
            prop_assert!(value > 0.0 && value <= slot.base_score());
            let decimals = candidate.score.as_str().split('.').nth(1).map(str::len);
            prop_assert_eq!(decimals, Some(4));
        }
        prop_assert!(RankSlot::ALL.len() >= triple.len());
    }

    #[test]
    fn suggestions_are_sorted_and_repeatable(
        cities in populated_cities(),
        q in query(),
        cascade in any::<bool>(),
    ) {
        let policy = if cascade { SlotPolicy::Cascade } else { SlotPolicy::Overwrite };
        let engine = SuggestionEngine::new(VecCatalog(cities))
            .with_config(EngineConfig::new().with_slot_policy(policy));
        let request = SuggestionRequest::new(q.as_str());
        let first = engine.suggest(&request).expect("in-memory catalog never fails");
        let second = engine.suggest(&request).expect("in-memory catalog never fails");
        prop_assert!(first.windows(2).all(|pair| pair[0].score >= pair[1].score));
        prop_assert_eq!(first, second);
    }
}
