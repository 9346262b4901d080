//! Selection candidates
//!
//! A candidate pairs a target with a unit (or diphone) that could realise
//! it. Its target cost comes from an external cost function and is computed
//! at most once.

use std::fmt;
use std::sync::OnceLock;

use crate::SelectedUnit;

/// Cost of realising a target with a unit; lower is better.
pub trait TargetCostFunction<T: ?Sized>: Send + Sync {
    fn cost(&self, target: &T, unit: &SelectedUnit) -> f64;
}

impl<T: ?Sized, F> TargetCostFunction<T> for F
where
    F: Fn(&T, &SelectedUnit) -> f64 + Send + Sync,
{
    fn cost(&self, target: &T, unit: &SelectedUnit) -> f64 {
        self(target, unit)
    }
}

pub struct Candidate<'t, T> {
    target: &'t T,
    unit: SelectedUnit,
    cost: OnceLock<f64>,
}

impl<'t, T> Candidate<'t, T> {
    pub fn new(target: &'t T, unit: SelectedUnit) -> Self {
        Candidate {
            target,
            unit,
            cost: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &'t T {
        self.target
    }

    pub fn unit(&self) -> &SelectedUnit {
        &self.unit
    }

    /// Target cost, computed by `f` on first request and cached.
    pub fn cost(&self, f: &dyn TargetCostFunction<T>) -> f64 {
        *self.cost.get_or_init(|| f.cost(self.target, &self.unit))
    }

    /// Cached cost, if already computed
    pub fn cached_cost(&self) -> Option<f64> {
        self.cost.get().copied()
    }
}

impl<T: fmt::Display> fmt::Debug for Candidate<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("target", &format_args!("{}", self.target))
            .field("unit", &self.unit)
            .field("cost", &self.cost.get())
            .finish()
    }
}
