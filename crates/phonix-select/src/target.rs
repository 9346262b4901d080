//! Selection targets
//!
//! A target describes one slot of the utterance to fill with recorded speech:
//! a phone symbol, an optional feature vector for the CART and the cost
//! function, and the markup context it came from.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use phonix_core::Unit;
use phonix_features::FeatureVector;

/// Markup attributes in scope for a target, chained to the enclosing element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkupContext {
    attributes: HashMap<String, String>,
    parent: Option<Arc<MarkupContext>>,
}

impl MarkupContext {
    pub fn new() -> Self {
        MarkupContext::default()
    }

    /// Context nested inside `parent`
    pub fn child_of(parent: &Arc<MarkupContext>) -> Self {
        MarkupContext {
            attributes: HashMap::new(),
            parent: Some(Arc::clone(parent)),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn parent(&self) -> Option<&Arc<MarkupContext>> {
        self.parent.as_ref()
    }

    /// Value of `name` on this element or the nearest ancestor defining it.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let mut ctx = Some(self);
        while let Some(c) = ctx {
            if let Some(v) = c.attributes.get(name) {
                return Some(v);
            }
            ctx = c.parent.as_deref();
        }
        None
    }
}

/// Half of a phone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HalfPhone {
    Left,
    Right,
}

impl HalfPhone {
    /// Value of the `halfphone_lr` feature for this side
    pub fn symbol(self) -> &'static str {
        match self {
            HalfPhone::Left => "L",
            HalfPhone::Right => "R",
        }
    }
}

/// One slot to fill
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub name: String,
    pub phone: String,
    /// Set for half-phone targets
    pub half: Option<HalfPhone>,
    pub features: Option<FeatureVector>,
    pub context: Option<Arc<MarkupContext>>,
}

impl Target {
    pub fn new(phone: impl Into<String>) -> Self {
        let phone = phone.into();
        Target {
            name: phone.clone(),
            phone,
            half: None,
            features: None,
            context: None,
        }
    }

    pub fn half_phone(phone: impl Into<String>, half: HalfPhone) -> Self {
        let mut target = Target::new(phone);
        target.name = format!("{}_{}", target.phone, half.symbol());
        target.half = Some(half);
        target
    }

    pub fn with_features(mut self, features: FeatureVector) -> Self {
        self.features = Some(features);
        self
    }

    pub fn with_context(mut self, context: Arc<MarkupContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Contextual attribute, resolved through the markup ancestry.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.context.as_deref()?.resolve(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Right half of one phone followed by the left half of the next
#[derive(Clone, Debug, PartialEq)]
pub struct DiphoneTarget {
    pub left: Target,
    pub right: Target,
}

impl DiphoneTarget {
    pub fn new(left: Target, right: Target) -> Self {
        DiphoneTarget { left, right }
    }

    /// Contextual attribute, taken from the left half first.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.left.attribute(name).or_else(|| self.right.attribute(name))
    }
}

impl fmt::Display for DiphoneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.left.phone, self.right.phone)
    }
}

/// Two adjacent units forming a diphone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiphoneUnit {
    pub left: Unit,
    pub right: Unit,
}

impl DiphoneUnit {
    /// Pair `left` with its successor. `None` unless the units are adjacent.
    pub fn new(left: Unit, right: Unit) -> Option<Self> {
        (right.index == left.index + 1).then_some(DiphoneUnit { left, right })
    }

    pub fn start_time(&self) -> i64 {
        self.left.start_time
    }

    pub fn duration(&self) -> i64 {
        self.left.duration + self.right.duration
    }
}

/// What a candidate proposes for its target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectedUnit {
    Unit(Unit),
    Diphone(DiphoneUnit),
}

impl SelectedUnit {
    /// Unit whose basename identifies the recording
    pub fn first_unit(&self) -> Unit {
        match self {
            SelectedUnit::Unit(u) => *u,
            SelectedUnit::Diphone(d) => d.left,
        }
    }

    /// Units covered, in time order
    pub fn units(&self) -> Vec<Unit> {
        match self {
            SelectedUnit::Unit(u) => vec![*u],
            SelectedUnit::Diphone(d) => vec![d.left, d.right],
        }
    }
}
