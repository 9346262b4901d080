//! End-to-end checks
//!
//! Checks that run against a whole loaded voice:
//! - Memory-mapped and piecewise timeline access return the same audio
//! - Every diphone in the recordings is found, once
//! - Blacklisted recordings never contribute candidates

use phonix_core::PhonixResult;
use phonix_features::FeatureFile;
use phonix_select::{
    DiphoneTarget, HalfPhone, MarkupContext, PhoneCart, SelectedUnit, Target, Voice,
    BLACKLIST_ATTRIBUTE,
};

use crate::synth::{SyntheticVoice, INVENTORY};

// ============================================================================
// ACCESS STRATEGIES
// ============================================================================

/// Outcome of comparing two readers unit by unit
#[derive(Clone, Debug, Default)]
pub struct ConsistencyReport {
    pub units_checked: usize,
    pub datagrams_checked: usize,
    /// Units whose datagrams differ between the two voices
    pub mismatches: Vec<usize>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Load the voice memory-mapped and piecewise with a tiny read window, and
/// compare the audio of every unit.
pub fn compare_access_strategies(synth: &SyntheticVoice, buffer_size: usize) -> PhonixResult<ConsistencyReport> {
    let mapped = synth.load(true)?;

    let mut config = synth.config()?;
    config.try_memory_map = false;
    config.buffer_size = buffer_size;
    let features = FeatureFile::load(&config.features)?;
    let piecewise = Voice::load(&config, Box::new(PhoneCart::from_features(&features)?))?;

    let mut report = ConsistencyReport::default();
    let a = mapped.database().base();
    let b = piecewise.database().base();
    for unit in a.units() {
        let left = a.unit_datagrams(unit)?;
        let right = b.unit_datagrams(unit)?;
        report.units_checked += 1;
        report.datagrams_checked += left.len();
        if left != right {
            tracing::warn!("unit {} differs between access strategies", unit.index);
            report.mismatches.push(unit.index);
        }
    }
    Ok(report)
}

// ============================================================================
// DIPHONE COVERAGE
// ============================================================================

/// Phone pairs whose diphone candidates differ from what the recordings
/// contain, with `(expected, found)` left-unit indices.
pub fn diphone_coverage_errors(
    synth: &SyntheticVoice,
    voice: &Voice,
) -> PhonixResult<Vec<(String, Vec<usize>, Vec<usize>)>> {
    let mut errors = Vec::new();
    for left in INVENTORY {
        for right in INVENTORY {
            let target = DiphoneTarget::new(
                Target::half_phone(left, HalfPhone::Right),
                Target::half_phone(right, HalfPhone::Left),
            );
            let found = left_units(&voice.database().get_diphone_candidates(&target)?);
            let expected = synth.diphone_occurrences(left, right);
            if found != expected {
                errors.push((target.to_string(), expected, found));
            }
        }
    }
    Ok(errors)
}

fn left_units(candidates: &[phonix_select::Candidate<'_, DiphoneTarget>]) -> Vec<usize> {
    candidates
        .iter()
        .map(|c| match c.unit() {
            SelectedUnit::Diphone(d) => d.left.index,
            SelectedUnit::Unit(u) => u.index,
        })
        .collect()
}

// ============================================================================
// BLACKLIST
// ============================================================================

/// Candidates for `phone` with and without a blacklist naming `recording`:
/// `(all, kept, leaked)` where `leaked` counts kept units recorded in a
/// blacklisted file.
pub fn blacklist_effect(voice: &Voice, phone: &str, recording: &str) -> PhonixResult<(usize, usize, usize)> {
    let db = voice.database().base();
    let plain = Target::new(phone);
    let all = db.get_candidates(&plain)?.len();

    let context = MarkupContext::new().with_attribute(BLACKLIST_ATTRIBUTE, recording);
    let filtered = Target::new(phone).with_context(std::sync::Arc::new(context));
    let kept = db.get_candidates(&filtered)?;
    let mut leaked = 0;
    for candidate in &kept {
        if let Some(name) = db.basename(&candidate.unit().first_unit())? {
            if name.contains(recording) {
                leaked += 1;
            }
        }
    }
    Ok((all, kept.len(), leaked))
}
