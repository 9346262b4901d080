//! Preselection
//!
//! The classification tree that narrows the unit inventory down to a leaf
//! of plausible units is trained elsewhere; the databases only consume its
//! answers through [`PreselectionCart`].

use std::collections::HashMap;

use phonix_core::{PhonixError, PhonixResult};
use phonix_features::FeatureFile;

use crate::Target;

/// Feature holding a unit's phone symbol
pub const PHONE_FEATURE: &str = "phone";
/// Feature telling which half of a phone a half-phone unit covers
pub const HALFPHONE_FEATURE: &str = "halfphone_lr";

/// Preselection oracle
pub trait PreselectionCart: Send + Sync {
    /// Unit indices in the leaf reached by `target`, at most
    /// `leaf_size_limit` of them.
    fn interpret(&self, target: &Target, leaf_size_limit: usize) -> Vec<usize>;
}

impl<F> PreselectionCart for F
where
    F: Fn(&Target, usize) -> Vec<usize> + Send + Sync,
{
    fn interpret(&self, target: &Target, leaf_size_limit: usize) -> Vec<usize> {
        self(target, leaf_size_limit)
    }
}

/// One-question tree splitting the inventory by phone symbol, and by side
/// for half-phone targets.
#[derive(Clone, Debug, Default)]
pub struct PhoneCart {
    leaves: HashMap<(String, Option<String>), Vec<usize>>,
}

impl PhoneCart {
    /// Build the leaves from a feature store's `phone` (and, when present,
    /// `halfphone_lr`) features.
    pub fn from_features(features: &FeatureFile) -> PhonixResult<Self> {
        let def = features.definition();
        let phone = def.feature_index(PHONE_FEATURE).ok_or_else(|| {
            PhonixError::UnsupportedSchema(format!("feature store has no {} feature", PHONE_FEATURE))
        })?;
        let side = def.feature_index(HALFPHONE_FEATURE);

        let mut leaves: HashMap<(String, Option<String>), Vec<usize>> = HashMap::new();
        for fv in features.feature_vectors() {
            let Some(symbol) = fv.value_as_string(def, phone) else {
                continue;
            };
            let half = side.and_then(|i| fv.value_as_string(def, i)).map(str::to_string);
            leaves
                .entry((symbol.to_string(), half.clone()))
                .or_default()
                .push(fv.unit_index);
            if half.is_some() {
                leaves.entry((symbol.to_string(), None)).or_default().push(fv.unit_index);
            }
        }
        Ok(PhoneCart { leaves })
    }

    /// Number of distinct leaves
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }
}

impl PreselectionCart for PhoneCart {
    fn interpret(&self, target: &Target, leaf_size_limit: usize) -> Vec<usize> {
        let key = (target.phone.clone(), target.half.map(|h| h.symbol().to_string()));
        self.leaves
            .get(&key)
            .map(|leaf| leaf.iter().copied().take(leaf_size_limit).collect())
            .unwrap_or_default()
    }
}
