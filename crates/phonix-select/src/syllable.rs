//! Syllable iteration
//!
//! Walks a closed range of units and yields the syllables found there. A
//! syllable starts on a unit with `segs_from_syl_start == 0` and ends on the
//! next unit with `segs_from_syl_end == 0`. Pauses (`_`) and edge units
//! (`0`) never start or end one. In half-phone stores a syllable starts on a
//! left half and ends on a right half.

use phonix_core::{PhonixError, PhonixResult};
use phonix_features::{FeatureFile, NULL_VALUE};

use crate::{HalfPhone, HALFPHONE_FEATURE, PHONE_FEATURE};

pub const SYLLABLE_START_FEATURE: &str = "segs_from_syl_start";
pub const SYLLABLE_END_FEATURE: &str = "segs_from_syl_end";

const PAUSE: &str = "_";

/// Inclusive unit range of one syllable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Syllable {
    pub from: usize,
    pub to: usize,
}

impl Syllable {
    pub fn len(&self) -> usize {
        self.to - self.from + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Lazy, single-pass syllable iterator
#[derive(Debug)]
pub struct SyllableIterator<'a> {
    features: &'a FeatureFile,
    phone: usize,
    start: usize,
    end: usize,
    side: Option<usize>,
    /// Next unit to look at
    pos: usize,
    /// Last unit of the range, inclusive
    last: usize,
    done: bool,
}

impl<'a> SyllableIterator<'a> {
    /// Iterate syllables within units `from..=to`.
    pub fn new(features: &'a FeatureFile, from: usize, to: usize) -> PhonixResult<Self> {
        if to >= features.len() {
            return Err(PhonixError::OutOfRange {
                what: "unit",
                index: to as i64,
                len: features.len(),
            });
        }
        let def = features.definition();
        let require = |name: &str| {
            def.feature_index(name).ok_or_else(|| {
                PhonixError::UnsupportedSchema(format!("syllable iteration needs a {} feature", name))
            })
        };
        let phone = require(PHONE_FEATURE)?;
        let start = require(SYLLABLE_START_FEATURE)?;
        let end = require(SYLLABLE_END_FEATURE)?;
        let side = if features.is_halfphone() {
            Some(require(HALFPHONE_FEATURE)?)
        } else {
            None
        };
        Ok(SyllableIterator {
            features,
            phone,
            start,
            end,
            side,
            pos: from,
            last: to,
            done: from > to,
        })
    }

    fn value(&self, unit: usize, feature: usize) -> Option<&'a str> {
        self.features.value_as_string(unit, feature).ok().flatten()
    }

    /// Whether `unit` can bound a syllable, given the counter feature and
    /// the half it must sit on.
    fn is_boundary(&self, unit: usize, counter: usize, half: HalfPhone) -> bool {
        match self.value(unit, self.phone) {
            Some(phone) if phone != NULL_VALUE && phone != PAUSE => {}
            _ => return false,
        }
        if self.value(unit, counter) != Some("0") {
            return false;
        }
        match self.side {
            Some(side) => self.value(unit, side) == Some(half.symbol()),
            None => true,
        }
    }

    fn is_start(&self, unit: usize) -> bool {
        self.is_boundary(unit, self.start, HalfPhone::Left)
    }

    fn is_end(&self, unit: usize) -> bool {
        self.is_boundary(unit, self.end, HalfPhone::Right)
    }
}

impl Iterator for SyllableIterator<'_> {
    type Item = Syllable;

    fn next(&mut self) -> Option<Syllable> {
        if self.done {
            return None;
        }
        let first = (self.pos..=self.last).find(|&u| self.is_start(u));
        let Some(from) = first else {
            self.done = true;
            return None;
        };
        let Some(to) = (from..=self.last).find(|&u| self.is_end(u)) else {
            self.done = true;
            return None;
        };
        if to == self.last {
            self.done = true;
        } else {
            self.pos = to + 1;
        }
        Some(Syllable { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use phonix_features::{DiscreteFeature, FeatureDefinition, FeatureFileWriter};
    use proptest::prelude::*;

    #[test]
    fn test_syllables_in_fixture() {
        let features = fixture::features_for(&fixture::SENTENCES);
        let syllables: Vec<Syllable> = SyllableIterator::new(&features, 0, 13).unwrap().collect();
        assert_eq!(
            syllables,
            vec![
                Syllable { from: 1, to: 4 },
                Syllable { from: 5, to: 6 },
                Syllable { from: 9, to: 12 },
            ]
        );
        assert_eq!(syllables[0].len(), 4);
    }

    #[test]
    fn test_partial_range() {
        let features = fixture::features_for(&fixture::SENTENCES);
        // Starts inside the first syllable: only complete ones follow
        let syllables: Vec<Syllable> = SyllableIterator::new(&features, 2, 6).unwrap().collect();
        assert_eq!(syllables, vec![Syllable { from: 5, to: 6 }]);

        // Dangling start yields nothing
        assert_eq!(SyllableIterator::new(&features, 9, 11).unwrap().count(), 0);
        assert_eq!(SyllableIterator::new(&features, 6, 5).unwrap().count(), 0);
    }

    #[test]
    fn test_construction_errors() {
        let features = fixture::features_for(&fixture::SENTENCES);
        assert!(matches!(
            SyllableIterator::new(&features, 0, 14),
            Err(PhonixError::OutOfRange { .. })
        ));

        let def = FeatureDefinition::new(vec![DiscreteFeature::new("phone", ["0", "a"])], vec![], vec![]).unwrap();
        let mut writer = FeatureFileWriter::new(def, false);
        writer.push_values(&[("phone", "a")]).unwrap();
        let bare = writer.finish();
        assert!(matches!(
            SyllableIterator::new(&bare, 0, 0),
            Err(PhonixError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_whole_phone_store_ignores_sides() {
        let def = FeatureDefinition::new(
            vec![
                DiscreteFeature::new("phone", ["0", "_", "h", "i"]),
                DiscreteFeature::new("segs_from_syl_start", ["0", "1"]),
                DiscreteFeature::new("segs_from_syl_end", ["0", "1"]),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let mut writer = FeatureFileWriter::new(def, false);
        for (phone, start, end) in [("h", "0", "1"), ("i", "1", "0"), ("_", "0", "0"), ("i", "0", "0")] {
            writer
                .push_values(&[("phone", phone), ("segs_from_syl_start", start), ("segs_from_syl_end", end)])
                .unwrap();
        }
        let store = writer.finish();
        let syllables: Vec<Syllable> = SyllableIterator::new(&store, 0, 3).unwrap().collect();
        assert_eq!(syllables, vec![Syllable { from: 0, to: 1 }, Syllable { from: 3, to: 3 }]);
    }

    fn row() -> impl Strategy<Value = (&'static str, &'static str, &'static str)> {
        (
            prop_oneof![Just("0"), Just("_"), Just("a"), Just("t")],
            prop_oneof![Just("0"), Just("1")],
            prop_oneof![Just("0"), Just("1")],
        )
    }

    proptest! {
        #[test]
        fn prop_syllables_ordered_and_bounded(rows in proptest::collection::vec(row(), 1..80)) {
            let def = FeatureDefinition::new(
                vec![
                    DiscreteFeature::new("phone", ["0", "_", "a", "t"]),
                    DiscreteFeature::new("segs_from_syl_start", ["0", "1"]),
                    DiscreteFeature::new("segs_from_syl_end", ["0", "1"]),
                ],
                vec![],
                vec![],
            )
            .unwrap();
            let mut writer = FeatureFileWriter::new(def, false);
            for &(phone, start, end) in &rows {
                writer
                    .push_values(&[("phone", phone), ("segs_from_syl_start", start), ("segs_from_syl_end", end)])
                    .unwrap();
            }
            let store = writer.finish();
            let syllables: Vec<Syllable> = SyllableIterator::new(&store, 0, rows.len() - 1).unwrap().collect();
            let mut previous_end: Option<usize> = None;
            for s in &syllables {
                prop_assert!(s.from <= s.to);
                if let Some(prev) = previous_end {
                    prop_assert!(s.from > prev);
                }
                for bound in [s.from, s.to] {
                    prop_assert!(rows[bound].0 != "0" && rows[bound].0 != "_");
                }
                prop_assert_eq!(rows[s.from].1, "0");
                prop_assert_eq!(rows[s.to].2, "0");
                previous_end = Some(s.to);
            }
        }
    }
}
