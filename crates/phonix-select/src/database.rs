//! Unit database
//!
//! Holds a voice's units, their feature vectors, the audio timeline and the
//! optional basename timeline, and answers candidate queries: preselect
//! through the CART, wrap each unit as a candidate, then drop candidates
//! recorded in blacklisted files.

use phonix_core::{PhonixError, PhonixResult, Unit, UnitFile};
use phonix_datagram::Datagram;
use phonix_features::FeatureFile;
use phonix_timeline::TimelineReader;

use crate::{
    Blacklist, Candidate, PreselectionCart, SelectedUnit, Target, BLACKLIST_ATTRIBUTE,
    PHONE_FEATURE,
};

/// Default maximum number of units taken from a CART leaf
pub const DEFAULT_LEAF_SIZE_LIMIT: usize = 500;

/// Unit database configuration
#[derive(Clone, Debug)]
pub struct UnitDatabaseConfig {
    /// Maximum number of units taken from a CART leaf
    pub leaf_size_limit: usize,
}

impl Default for UnitDatabaseConfig {
    fn default() -> Self {
        UnitDatabaseConfig {
            leaf_size_limit: DEFAULT_LEAF_SIZE_LIMIT,
        }
    }
}

pub struct UnitDatabase {
    config: UnitDatabaseConfig,
    units: UnitFile,
    features: FeatureFile,
    cart: Box<dyn PreselectionCart>,
    audio: TimelineReader,
    basenames: Option<TimelineReader>,
}

impl UnitDatabase {
    /// Assemble a database. There must be one feature vector per unit, and
    /// every timeline must run at the unit file's sample rate.
    pub fn new(
        config: UnitDatabaseConfig,
        units: UnitFile,
        features: FeatureFile,
        cart: Box<dyn PreselectionCart>,
        audio: TimelineReader,
        basenames: Option<TimelineReader>,
    ) -> PhonixResult<Self> {
        if features.len() != units.len() {
            return Err(PhonixError::MalformedFile(format!(
                "{} feature vectors for {} units",
                features.len(),
                units.len()
            )));
        }
        let timelines = std::iter::once(("audio", &audio))
            .chain(basenames.as_ref().map(|b| ("basename", b)));
        for (role, timeline) in timelines {
            if timeline.sample_rate() != units.sample_rate() {
                return Err(PhonixError::MalformedFile(format!(
                    "{} timeline runs at {} Hz but units are at {} Hz",
                    role,
                    timeline.sample_rate(),
                    units.sample_rate()
                )));
            }
        }
        Ok(UnitDatabase {
            config,
            units,
            features,
            cart,
            audio,
            basenames,
        })
    }

    pub fn config(&self) -> &UnitDatabaseConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn sample_rate(&self) -> i32 {
        self.units.sample_rate()
    }

    pub fn unit(&self, index: usize) -> PhonixResult<Unit> {
        self.units.unit(index)
    }

    pub fn units(&self) -> &[Unit] {
        self.units.units()
    }

    pub fn features(&self) -> &FeatureFile {
        &self.features
    }

    pub fn audio_timeline(&self) -> &TimelineReader {
        &self.audio
    }

    pub fn basename_timeline(&self) -> Option<&TimelineReader> {
        self.basenames.as_ref()
    }

    /// Phone symbol of a unit, if the store has a `phone` feature.
    pub fn unit_phone(&self, index: usize) -> Option<&str> {
        let phone = self.features.definition().feature_index(PHONE_FEATURE)?;
        self.features.value_as_string(index, phone).ok().flatten()
    }

    /// Name of the recording a unit was cut from. `None` without a basename
    /// timeline or when the unit lies past its end.
    pub fn basename(&self, unit: &Unit) -> PhonixResult<Option<String>> {
        let Some(timeline) = &self.basenames else {
            return Ok(None);
        };
        let datagram = timeline.get_datagram_at_rate(unit.start_time, self.units.sample_rate())?;
        datagram
            .map(|d| d.as_text().map(str::to_string))
            .transpose()
    }

    /// Audio datagrams covering a unit
    pub fn unit_datagrams(&self, unit: &Unit) -> PhonixResult<Vec<Datagram>> {
        self.audio.get_unit_datagrams(unit, self.units.sample_rate())
    }

    /// Indices from the CART, minus those outside the unit array.
    pub(crate) fn preselect(&self, target: &Target) -> Vec<usize> {
        let mut indices = self.cart.interpret(target, self.config.leaf_size_limit);
        let len = self.units.len();
        indices.retain(|&i| {
            if i >= len {
                tracing::warn!("CART returned unit {} for {} but the voice has {} units", i, target, len);
                false
            } else {
                true
            }
        });
        indices
    }

    /// Drop candidates whose recording matches the blacklist in scope.
    pub(crate) fn filter_blacklisted<'t, T>(
        &self,
        blacklist: Option<&str>,
        candidates: Vec<Candidate<'t, T>>,
    ) -> PhonixResult<Vec<Candidate<'t, T>>> {
        let Some(blacklist) = Blacklist::from_attribute(blacklist) else {
            return Ok(candidates);
        };
        if self.basenames.is_none() {
            tracing::debug!("blacklist {:?} ignored: voice has no basename timeline", blacklist.patterns());
            return Ok(candidates);
        }
        let before = candidates.len();
        let mut kept = Vec::with_capacity(before);
        for candidate in candidates {
            let blocked = match self.basename(&candidate.unit().first_unit())? {
                Some(name) => blacklist.matches(&name),
                None => false,
            };
            if !blocked {
                kept.push(candidate);
            }
        }
        tracing::debug!("blacklist removed {} of {} candidates", before - kept.len(), before);
        Ok(kept)
    }

    /// Candidates for one target.
    pub fn get_candidates<'t>(&self, target: &'t Target) -> PhonixResult<Vec<Candidate<'t, Target>>> {
        let candidates: Vec<_> = self
            .preselect(target)
            .into_iter()
            .map(|i| Candidate::new(target, SelectedUnit::Unit(self.units.units()[i])))
            .collect();
        let preselected = candidates.len();
        let candidates = self.filter_blacklisted(target.attribute(BLACKLIST_ATTRIBUTE), candidates)?;
        tracing::debug!(
            "{}: {} preselected, {} returned",
            target,
            preselected,
            candidates.len()
        );
        Ok(candidates)
    }
}

impl std::fmt::Debug for UnitDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitDatabase")
            .field("units", &self.units.len())
            .field("sample_rate", &self.units.sample_rate())
            .field("leaf_size_limit", &self.config.leaf_size_limit)
            .field("audio", &self.audio)
            .field("basenames", &self.basenames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use crate::{HalfPhone, MarkupContext, PhoneCart};
    use std::sync::Arc;

    fn blacklisted(target: Target, list: &str) -> Target {
        target.with_context(Arc::new(MarkupContext::new().with_attribute(BLACKLIST_ATTRIBUTE, list)))
    }

    #[test]
    fn test_candidates_from_cart() {
        let db = fixture::database(true);
        let target = Target::half_phone("a", HalfPhone::Right);
        let candidates = db.get_candidates(&target).unwrap();
        let indices: Vec<usize> = candidates.iter().map(|c| c.unit().first_unit().index).collect();
        assert_eq!(indices, vec![2, 6, 10]);
        assert!(candidates.iter().all(|c| std::ptr::eq(c.target(), &target)));
    }

    #[test]
    fn test_blacklist_drops_recordings() {
        let db = fixture::database(true);
        let target = blacklisted(Target::half_phone("a", HalfPhone::Right), "b0002");
        let indices: Vec<usize> = db
            .get_candidates(&target)
            .unwrap()
            .iter()
            .map(|c| c.unit().first_unit().index)
            .collect();
        assert_eq!(indices, vec![2, 6]);
        for c in db.get_candidates(&target).unwrap() {
            let name = db.basename(&c.unit().first_unit()).unwrap().unwrap();
            assert!(!name.contains("b0002"));
        }
    }

    #[test]
    fn test_blacklist_inherited_from_ancestor() {
        let db = fixture::database(true);
        let root = Arc::new(MarkupContext::new().with_attribute(BLACKLIST_ATTRIBUTE, "arctic_a"));
        let target = Target::new("t").with_context(Arc::new(MarkupContext::child_of(&root)));
        let indices: Vec<usize> = db
            .get_candidates(&target)
            .unwrap()
            .iter()
            .map(|c| c.unit().first_unit().index)
            .collect();
        assert_eq!(indices, vec![11, 12]);
    }

    #[test]
    fn test_blacklist_without_basenames_is_noop() {
        let db = fixture::database(false);
        let target = blacklisted(Target::half_phone("a", HalfPhone::Right), "b0002");
        assert_eq!(db.get_candidates(&target).unwrap().len(), 3);
        assert_eq!(db.basename(&db.unit(2).unwrap()).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_cart_indices_skipped() {
        let (units, features, audio, _) = fixture::parts();
        let cart = |_: &Target, _: usize| vec![1usize, 99, 3];
        let db = UnitDatabase::new(
            UnitDatabaseConfig::default(),
            units,
            features,
            Box::new(cart),
            audio,
            None,
        )
        .unwrap();
        let target = Target::new("a");
        let indices: Vec<usize> = db
            .get_candidates(&target)
            .unwrap()
            .iter()
            .map(|c| c.unit().first_unit().index)
            .collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_leaf_size_limit_passed_to_cart() {
        let (units, features, audio, _) = fixture::parts();
        let cart = PhoneCart::from_features(&features).unwrap();
        let db = UnitDatabase::new(
            UnitDatabaseConfig { leaf_size_limit: 2 },
            units,
            features,
            Box::new(cart),
            audio,
            None,
        )
        .unwrap();
        assert_eq!(db.get_candidates(&Target::new("a")).unwrap().len(), 2);
    }

    #[test]
    fn test_accessors() {
        let db = fixture::database(true);
        assert_eq!(db.len(), 14);
        assert_eq!(db.unit_phone(3), Some("t"));
        assert_eq!(db.unit_phone(0), Some("0"));
        assert!(matches!(db.unit(14), Err(PhonixError::OutOfRange { .. })));
        assert_eq!(
            db.basename(&db.unit(1).unwrap()).unwrap().as_deref(),
            Some("arctic_a0001")
        );
        assert_eq!(db.basename(&db.unit(13).unwrap()).unwrap(), None);

        let unit = db.unit(1).unwrap();
        let audio = db.unit_datagrams(&unit).unwrap();
        assert_eq!(audio.iter().map(|d| d.duration).sum::<i64>(), unit.duration);
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let (units, _, audio, _) = fixture::parts();
        let short = fixture::features_for(&fixture::SENTENCES[..1]);
        let cart = |_: &Target, _: usize| Vec::<usize>::new();
        assert!(matches!(
            UnitDatabase::new(UnitDatabaseConfig::default(), units, short, Box::new(cart), audio, None),
            Err(PhonixError::MalformedFile(_))
        ));

        let (units, features, _, _) = fixture::parts();
        let wrong_rate = fixture::audio_timeline(8000, 4000);
        assert!(UnitDatabase::new(
            UnitDatabaseConfig::default(),
            units,
            features,
            Box::new(cart),
            wrong_rate,
            None
        )
        .is_err());
    }
}
