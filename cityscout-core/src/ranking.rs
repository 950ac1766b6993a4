//! Select the three best candidates from a matched set.
//!
//! Both selectors make a single pass over the records in fetch order and keep
//! three running bounds, one per [`RankSlot`]. A record fills the first slot
//! whose bound it strictly beats; ties never qualify.
//!
//! Two behaviours are configurable because they are observable:
//!
//! - [`SlotPolicy::Overwrite`] replaces a slot without demoting its previous
//!   occupant, while [`SlotPolicy::Cascade`] shifts occupants down like a
//!   bounded top-k.
//! - [`DistanceOrder::Farthest`] keeps the largest distances, while
//!   [`DistanceOrder::Nearest`] keeps the smallest.

use std::fmt;
use std::str::FromStr;

use geo::Coord;
use log::debug;
use thiserror::Error;

use crate::{CityRecord, DistanceMetric, Score};

/// Whether distance ranking keeps the farthest matches by default.
pub const RANK_BY_FARTHEST: bool = true;

/// One of the three rank positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankSlot {
    /// Best match, base score `1.0`.
    Top,
    /// Runner-up, base score `0.9`.
    Second,
    /// Third place, base score `0.8`.
    Third,
}

impl RankSlot {
    /// All slots in rank order.
    pub const ALL: [Self; 3] = [Self::Top, Self::Second, Self::Third];

    /// Fixed score assigned to the slot before length normalisation.
    #[must_use]
    pub const fn base_score(self) -> f64 {
        match self {
            Self::Top => 1.0,
            Self::Second => 0.9,
            Self::Third => 0.8,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }

    const fn below(self) -> Option<Self> {
        match self {
            Self::Top => Some(Self::Second),
            Self::Second => Some(Self::Third),
            Self::Third => None,
        }
    }
}

/// A city placed in a rank slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// City name.
    pub name: String,
    /// WGS84 position, `x = longitude`, `y = latitude`.
    pub location: Coord<f64>,
    /// Base score of the slot, or the normalised score after
    /// [`normalise`](crate::normalise).
    pub score: Score,
}

impl Candidate {
    fn placed(record: CityRecord, slot: RankSlot) -> Self {
        Self {
            name: record.name,
            location: record.location,
            score: Score::from_raw(slot.base_score()),
        }
    }
}

/// Up to three candidates keyed by [`RankSlot`].
///
/// Slots are optional and never synthesised: fewer than three qualifying
/// records leave slots empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedTriple {
    slots: [Option<Candidate>; 3],
}

impl RankedTriple {
    /// Candidate in `slot`, if filled.
    #[must_use]
    pub fn get(&self, slot: RankSlot) -> Option<&Candidate> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }

    /// Mutable access to the candidate in `slot`, if filled.
    pub fn get_mut(&mut self, slot: RankSlot) -> Option<&mut Candidate> {
        self.slots.get_mut(slot.index()).and_then(Option::as_mut)
    }

    /// Best candidate.
    #[must_use]
    pub fn top(&self) -> Option<&Candidate> {
        self.get(RankSlot::Top)
    }

    /// Runner-up.
    #[must_use]
    pub fn second(&self) -> Option<&Candidate> {
        self.get(RankSlot::Second)
    }

    /// Third place.
    #[must_use]
    pub fn third(&self) -> Option<&Candidate> {
        self.get(RankSlot::Third)
    }

    /// Number of filled slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no slot is filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filled slots in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (RankSlot, &Candidate)> {
        RankSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|candidate| (slot, candidate)))
    }

    /// Consume the triple, yielding filled slots in rank order.
    #[must_use]
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.slots.into_iter().flatten().collect()
    }

    fn place(&mut self, slot: RankSlot, candidate: Candidate) {
        if let Some(entry) = self.slots.get_mut(slot.index()) {
            *entry = Some(candidate);
        }
    }

    /// Move every occupant from `slot` downwards by one position, dropping
    /// whatever falls off the end. Moved candidates take their new slot's
    /// base score.
    fn cascade_from(&mut self, slot: RankSlot) {
        let Some(below) = slot.below() else {
            return;
        };
        self.cascade_from(below);
        let moved = self
            .slots
            .get_mut(slot.index())
            .and_then(Option::take)
            .map(|mut candidate| {
                candidate.score = Score::from_raw(below.base_score());
                candidate
            });
        if let Some(candidate) = moved {
            self.place(below, candidate);
        }
    }
}

/// What happens to a slot's occupant when a better record arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SlotPolicy {
    /// Replace the occupant and discard it; lower slots are untouched.
    #[default]
    Overwrite,
    /// Demote the occupant and everything below it by one slot.
    Cascade,
}

/// Which end of the distance range wins in distance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DistanceOrder {
    /// Largest distance ranks first.
    Farthest,
    /// Smallest distance ranks first.
    Nearest,
}

impl Default for DistanceOrder {
    fn default() -> Self {
        if RANK_BY_FARTHEST {
            Self::Farthest
        } else {
            Self::Nearest
        }
    }
}

/// Error returned when parsing a [`SlotPolicy`] or [`DistanceOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}; expected one of {expected}")]
pub struct ParseRankingOptionError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for SlotPolicy {
    type Err = ParseRankingOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "cascade" => Ok(Self::Cascade),
            _ => Err(ParseRankingOptionError {
                kind: "slot policy",
                value: s.to_owned(),
                expected: "overwrite, cascade",
            }),
        }
    }
}

impl fmt::Display for SlotPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overwrite => "overwrite",
            Self::Cascade => "cascade",
        })
    }
}

impl FromStr for DistanceOrder {
    type Err = ParseRankingOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farthest" => Ok(Self::Farthest),
            "nearest" => Ok(Self::Nearest),
            _ => Err(ParseRankingOptionError {
                kind: "distance order",
                value: s.to_owned(),
                expected: "farthest, nearest",
            }),
        }
    }
}

impl fmt::Display for DistanceOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Farthest => "farthest",
            Self::Nearest => "nearest",
        })
    }
}

/// Comparator over the ranking metric.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Descending,
    Ascending,
}

impl Direction {
    const fn sentinel(self) -> f64 {
        match self {
            Self::Descending => f64::NEG_INFINITY,
            Self::Ascending => f64::INFINITY,
        }
    }

    const fn outranks(self, value: f64, bound: f64) -> bool {
        match self {
            Self::Descending => value > bound,
            Self::Ascending => value < bound,
        }
    }
}

/// Running bounds for the three slots.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    top: f64,
    second: f64,
    third: f64,
}

impl Bounds {
    const fn new(direction: Direction) -> Self {
        let sentinel = direction.sentinel();
        Self {
            top: sentinel,
            second: sentinel,
            third: sentinel,
        }
    }

    /// Find the slot `value` qualifies for and shift the bounds accordingly.
    const fn admit(&mut self, value: f64, direction: Direction) -> Option<RankSlot> {
        if direction.outranks(value, self.top) {
            *self = Self {
                top: value,
                second: self.top,
                third: self.second,
            };
            Some(RankSlot::Top)
        } else if direction.outranks(value, self.second) {
            self.third = self.second;
            self.second = value;
            Some(RankSlot::Second)
        } else if direction.outranks(value, self.third) {
            self.third = value;
            Some(RankSlot::Third)
        } else {
            None
        }
    }
}

fn select_top3<I, F>(
    records: I,
    direction: Direction,
    policy: SlotPolicy,
    mut metric: F,
) -> RankedTriple
where
    I: IntoIterator<Item = CityRecord>,
    F: FnMut(&CityRecord) -> Option<f64>,
{
    let mut bounds = Bounds::new(direction);
    let mut triple = RankedTriple::default();
    for record in records {
        let Some(value) = metric(&record) else {
            debug!("skipping {:?}: no ranking metric", record.name);
            continue;
        };
        let Some(slot) = bounds.admit(value, direction) else {
            continue;
        };
        if policy == SlotPolicy::Cascade {
            triple.cascade_from(slot);
        }
        triple.place(slot, Candidate::placed(record, slot));
    }
    triple
}

/// Keep the three most populous records.
///
/// Records without a population never qualify.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use cityscout_core::{CityRecord, SlotPolicy, select_top3_by_population};
///
/// let origin = Coord { x: 0.0, y: 0.0 };
/// let records = vec![
///     CityRecord::new("Montreal", origin).with_population(1_780_000),
///     CityRecord::new("Monticello", origin).with_population(1_200),
///     CityRecord::new("Montpelier", origin).with_population(7_500),
/// ];
///
/// let triple = select_top3_by_population(records, SlotPolicy::Overwrite);
/// assert_eq!(triple.top().map(|c| c.name.as_str()), Some("Montreal"));
/// assert_eq!(triple.second().map(|c| c.name.as_str()), Some("Montpelier"));
/// assert_eq!(triple.third().map(|c| c.name.as_str()), Some("Monticello"));
/// ```
#[must_use]
pub fn select_top3_by_population<I>(records: I, policy: SlotPolicy) -> RankedTriple
where
    I: IntoIterator<Item = CityRecord>,
{
    #[expect(
        clippy::cast_precision_loss,
        reason = "populations are far below 2^53"
    )]
    let metric = |record: &CityRecord| record.population.map(|population| population as f64);
    select_top3(records, Direction::Descending, policy, metric)
}

/// Keep three records ranked by their distance from `reference`.
///
/// With [`DistanceOrder::Farthest`] the largest distances win; with
/// [`DistanceOrder::Nearest`] the smallest do. Non-finite distances never
/// qualify.
#[must_use]
pub fn select_top3_by_distance<I, D>(
    reference: Coord<f64>,
    records: I,
    distance: &D,
    order: DistanceOrder,
    policy: SlotPolicy,
) -> RankedTriple
where
    I: IntoIterator<Item = CityRecord>,
    D: DistanceMetric + ?Sized,
{
    let direction = match order {
        DistanceOrder::Farthest => Direction::Descending,
        DistanceOrder::Nearest => Direction::Ascending,
    };
    let metric = |record: &CityRecord| {
        let km = distance.distance_km(reference, record.location);
        km.is_finite().then_some(km)
    };
    select_top3(records, direction, policy, metric)
}
