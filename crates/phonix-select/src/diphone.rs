//! Diphone unit database
//!
//! Diphones are not stored; they are pairs of adjacent half-phone units. A
//! diphone target `L-R` is answered from both halves: left candidates with
//! phone `L` followed by a unit with phone `R`, and right candidates with
//! phone `R` preceded by a unit with phone `L`. Each pair is reported once,
//! ordered by its left unit.

use std::collections::BTreeSet;

use phonix_core::{PhonixError, PhonixResult};

use crate::{
    Candidate, DiphoneTarget, DiphoneUnit, SelectedUnit, Target, UnitDatabase, BLACKLIST_ATTRIBUTE,
    PHONE_FEATURE,
};

#[derive(Debug)]
pub struct DiphoneUnitDatabase {
    base: UnitDatabase,
    phone_feature: usize,
}

impl DiphoneUnitDatabase {
    /// Wrap a half-phone unit database. Its feature store must carry a
    /// `phone` feature.
    pub fn new(base: UnitDatabase) -> PhonixResult<Self> {
        let phone_feature = base
            .features()
            .definition()
            .feature_index(PHONE_FEATURE)
            .ok_or_else(|| {
                PhonixError::UnsupportedSchema(format!(
                    "diphone selection needs a {} feature",
                    PHONE_FEATURE
                ))
            })?;
        if !base.features().is_halfphone() {
            tracing::warn!("diphone database built on a store not marked as half-phone");
        }
        Ok(DiphoneUnitDatabase { base, phone_feature })
    }

    /// Underlying half-phone database
    pub fn base(&self) -> &UnitDatabase {
        &self.base
    }

    pub fn into_inner(self) -> UnitDatabase {
        self.base
    }

    /// Half-phone targets are answered by the underlying database.
    pub fn get_candidates<'t>(&self, target: &'t Target) -> PhonixResult<Vec<Candidate<'t, Target>>> {
        self.base.get_candidates(target)
    }

    fn phone_code(&self, unit_index: usize) -> Option<i32> {
        self.base
            .features()
            .feature_vector(unit_index)
            .ok()?
            .discrete(self.phone_feature)
    }

    /// Candidates for a diphone target.
    ///
    /// An empty result is not an error: the pair may simply not occur in
    /// the recordings, or a phone may be unknown to the voice.
    pub fn get_diphone_candidates<'t>(
        &self,
        target: &'t DiphoneTarget,
    ) -> PhonixResult<Vec<Candidate<'t, DiphoneTarget>>> {
        let def = self.base.features().definition();
        let (Some(left), Some(right)) = (
            def.value_code(self.phone_feature, &target.left.phone),
            def.value_code(self.phone_feature, &target.right.phone),
        ) else {
            tracing::debug!("{}: phone unknown to the voice, no diphones", target);
            return Ok(Vec::new());
        };

        let len = self.base.len();
        let mut anchors = BTreeSet::new();
        for u in self.base.preselect(&target.left) {
            if self.phone_code(u) == Some(left) && u + 1 < len && self.phone_code(u + 1) == Some(right) {
                anchors.insert(u);
            }
        }
        for v in self.base.preselect(&target.right) {
            if self.phone_code(v) == Some(right) && v >= 1 && self.phone_code(v - 1) == Some(left) {
                anchors.insert(v - 1);
            }
        }

        let units = self.base.units();
        let candidates: Vec<_> = anchors
            .into_iter()
            .filter_map(|u| DiphoneUnit::new(units[u], units[u + 1]))
            .map(|d| Candidate::new(target, SelectedUnit::Diphone(d)))
            .collect();
        let found = candidates.len();
        let candidates = self
            .base
            .filter_blacklisted(target.attribute(BLACKLIST_ATTRIBUTE), candidates)?;
        if candidates.is_empty() {
            tracing::debug!("{}: no diphone candidates ({} before blacklist)", target, found);
        } else {
            tracing::debug!("{}: {} diphones, {} returned", target, found, candidates.len());
        }
        Ok(candidates)
    }
}
