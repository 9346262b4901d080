//! Feature schema
//!
//! Binary layout (big-endian, strings as u16 length + UTF-8):
//! - i32 number of byte features; per feature: f32 weight, name,
//!   u8 number of values, values
//! - i32 number of short features; per feature: f32 weight, name,
//!   i16 number of values, values
//! - i32 number of continuous features; per feature: f32 weight,
//!   weighting function, name
//!
//! Feature indices are global: byte features first, then short, then
//! continuous. A discrete feature value is an index into that feature's
//! value table.

use std::collections::HashMap;
use std::fmt;

use bytes::{Buf, BufMut};

use phonix_core::{put_utf, PhonixError, PhonixResult, StructuredBuf};

/// Value carried by every discrete feature when it does not apply
pub const NULL_VALUE: &str = "0";

/// Storage class of a feature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Byte,
    Short,
    Continuous,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureKind::Byte => "byte",
            FeatureKind::Short => "short",
            FeatureKind::Continuous => "continuous",
        })
    }
}

/// Byte- or short-valued feature with its value table
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteFeature {
    pub name: String,
    pub weight: f32,
    pub values: Vec<String>,
}

impl DiscreteFeature {
    pub fn new<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        DiscreteFeature {
            name: name.into(),
            weight: 1.0,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    fn value_index(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// Float-valued feature
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousFeature {
    pub name: String,
    pub weight: f32,
    /// Name of the distance weighting function, empty when unset
    pub weight_fn: String,
}

impl ContinuousFeature {
    pub fn new(name: impl Into<String>) -> Self {
        ContinuousFeature {
            name: name.into(),
            weight: 1.0,
            weight_fn: String::new(),
        }
    }
}

/// Feature schema shared by every vector of a store
#[derive(Clone, Debug)]
pub struct FeatureDefinition {
    bytes: Vec<DiscreteFeature>,
    shorts: Vec<DiscreteFeature>,
    continuous: Vec<ContinuousFeature>,
    by_name: HashMap<String, usize>,
}

impl FeatureDefinition {
    /// Build a schema. Names must be unique; byte features hold at most
    /// 255 values and short features at most `i16::MAX`.
    pub fn new(
        bytes: Vec<DiscreteFeature>,
        shorts: Vec<DiscreteFeature>,
        continuous: Vec<ContinuousFeature>,
    ) -> PhonixResult<Self> {
        if let Some(f) = bytes.iter().find(|f| f.values.len() > u8::MAX as usize) {
            return Err(PhonixError::InvalidArgument(format!(
                "byte feature {} has {} values, at most 255 fit",
                f.name,
                f.values.len()
            )));
        }
        if let Some(f) = shorts.iter().find(|f| f.values.len() > i16::MAX as usize) {
            return Err(PhonixError::InvalidArgument(format!(
                "short feature {} has {} values, at most {} fit",
                f.name,
                f.values.len(),
                i16::MAX
            )));
        }
        let names = bytes
            .iter()
            .map(|f| f.name.as_str())
            .chain(shorts.iter().map(|f| f.name.as_str()))
            .chain(continuous.iter().map(|f| f.name.as_str()));
        let mut by_name = HashMap::new();
        for (i, name) in names.enumerate() {
            if by_name.insert(name.to_string(), i).is_some() {
                return Err(PhonixError::InvalidArgument(format!(
                    "duplicate feature name {}",
                    name
                )));
            }
        }
        Ok(FeatureDefinition {
            bytes,
            shorts,
            continuous,
            by_name,
        })
    }

    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        let n_bytes = buf.read_count("byte feature count")?;
        let mut bytes = Vec::with_capacity(n_bytes.min(1024));
        for _ in 0..n_bytes {
            let weight = buf.read_f32("feature weight")?;
            let name = buf.read_utf("feature name")?;
            let n_values = buf.read_u8("byte feature arity")? as usize;
            let values = (0..n_values)
                .map(|_| buf.read_utf("feature value"))
                .collect::<PhonixResult<Vec<_>>>()?;
            bytes.push(DiscreteFeature { name, weight, values });
        }

        let n_shorts = buf.read_count("short feature count")?;
        let mut shorts = Vec::with_capacity(n_shorts.min(1024));
        for _ in 0..n_shorts {
            let weight = buf.read_f32("feature weight")?;
            let name = buf.read_utf("feature name")?;
            let n_values = buf.read_i16("short feature arity")?;
            if n_values < 0 {
                return Err(PhonixError::MalformedFile(format!(
                    "short feature {} has negative arity {}",
                    name, n_values
                )));
            }
            let values = (0..n_values)
                .map(|_| buf.read_utf("feature value"))
                .collect::<PhonixResult<Vec<_>>>()?;
            shorts.push(DiscreteFeature { name, weight, values });
        }

        let n_continuous = buf.read_count("continuous feature count")?;
        let mut continuous = Vec::with_capacity(n_continuous.min(1024));
        for _ in 0..n_continuous {
            let weight = buf.read_f32("feature weight")?;
            let weight_fn = buf.read_utf("weighting function")?;
            let name = buf.read_utf("feature name")?;
            continuous.push(ContinuousFeature {
                name,
                weight,
                weight_fn,
            });
        }

        Self::new(bytes, shorts, continuous).map_err(|e| match e {
            PhonixError::InvalidArgument(msg) => PhonixError::MalformedFile(msg),
            other => other,
        })
    }

    pub fn write(&self, buf: &mut impl BufMut) -> PhonixResult<()> {
        buf.put_i32(self.bytes.len() as i32);
        for f in &self.bytes {
            buf.put_f32(f.weight);
            put_utf(buf, &f.name)?;
            buf.put_u8(f.values.len() as u8);
            for v in &f.values {
                put_utf(buf, v)?;
            }
        }
        buf.put_i32(self.shorts.len() as i32);
        for f in &self.shorts {
            buf.put_f32(f.weight);
            put_utf(buf, &f.name)?;
            buf.put_i16(f.values.len() as i16);
            for v in &f.values {
                put_utf(buf, v)?;
            }
        }
        buf.put_i32(self.continuous.len() as i32);
        for f in &self.continuous {
            buf.put_f32(f.weight);
            put_utf(buf, &f.weight_fn)?;
            put_utf(buf, &f.name)?;
        }
        Ok(())
    }

    #[inline]
    pub fn num_byte_features(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn num_short_features(&self) -> usize {
        self.shorts.len()
    }

    #[inline]
    pub fn num_continuous_features(&self) -> usize {
        self.continuous.len()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.bytes.len() + self.shorts.len() + self.continuous.len()
    }

    pub fn byte_features(&self) -> &[DiscreteFeature] {
        &self.bytes
    }

    pub fn short_features(&self) -> &[DiscreteFeature] {
        &self.shorts
    }

    pub fn continuous_features(&self) -> &[ContinuousFeature] {
        &self.continuous
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn kind(&self, index: usize) -> Option<FeatureKind> {
        let nb = self.bytes.len();
        let ns = self.shorts.len();
        if index < nb {
            Some(FeatureKind::Byte)
        } else if index < nb + ns {
            Some(FeatureKind::Short)
        } else if index < self.num_features() {
            Some(FeatureKind::Continuous)
        } else {
            None
        }
    }

    fn discrete(&self, index: usize) -> Option<&DiscreteFeature> {
        let nb = self.bytes.len();
        if index < nb {
            self.bytes.get(index)
        } else {
            self.shorts.get(index - nb)
        }
    }

    pub fn feature_name(&self, index: usize) -> Option<&str> {
        let offset = self.bytes.len() + self.shorts.len();
        match self.kind(index)? {
            FeatureKind::Continuous => Some(&self.continuous[index - offset].name),
            _ => self.discrete(index).map(|f| f.name.as_str()),
        }
    }

    pub fn weight(&self, index: usize) -> Option<f32> {
        let offset = self.bytes.len() + self.shorts.len();
        match self.kind(index)? {
            FeatureKind::Continuous => Some(self.continuous[index - offset].weight),
            _ => self.discrete(index).map(|f| f.weight),
        }
    }

    /// Arity of a discrete feature; zero for continuous features.
    pub fn number_of_values(&self, index: usize) -> usize {
        self.discrete(index).map_or(0, |f| f.values.len())
    }

    pub fn possible_values(&self, index: usize) -> &[String] {
        self.discrete(index).map(|f| f.values.as_slice()).unwrap_or(&[])
    }

    /// Byte code of `value` for byte feature `index`.
    pub fn value_as_byte(&self, index: usize, value: &str) -> Option<u8> {
        if self.kind(index)? != FeatureKind::Byte {
            return None;
        }
        self.bytes[index].value_index(value).map(|i| i as u8)
    }

    /// Short code of `value` for short feature `index`.
    pub fn value_as_short(&self, index: usize, value: &str) -> Option<i16> {
        if self.kind(index)? != FeatureKind::Short {
            return None;
        }
        self.shorts[index - self.bytes.len()]
            .value_index(value)
            .map(|i| i as i16)
    }

    /// Code of `value` for any discrete feature.
    pub fn value_code(&self, index: usize, value: &str) -> Option<i32> {
        self.discrete(index)?.value_index(value).map(|i| i as i32)
    }

    /// String for code `code` of discrete feature `index`.
    pub fn value_as_string(&self, index: usize, code: i32) -> Option<&str> {
        let code = usize::try_from(code).ok()?;
        self.discrete(index)?.values.get(code).map(String::as_str)
    }

    /// Whether `other` is a sub-schema of this one: every feature of
    /// `other` exists here with the same kind, and discrete features carry
    /// identical value tables.
    pub fn contains(&self, other: &FeatureDefinition) -> bool {
        self.check_contains(other).is_ok()
    }

    /// Like [`contains`](Self::contains), naming the first mismatch.
    pub fn check_contains(&self, other: &FeatureDefinition) -> PhonixResult<()> {
        for index in 0..other.num_features() {
            let name = other.feature_name(index).unwrap_or_default();
            let kind = other.kind(index);
            let Some(own) = self.feature_index(name) else {
                return Err(PhonixError::UnsupportedSchema(format!(
                    "feature {} is not in the source schema",
                    name
                )));
            };
            if self.kind(own) != kind {
                return Err(PhonixError::UnsupportedSchema(format!(
                    "feature {} is {} in the source schema but {} in the target",
                    name,
                    self.kind(own).map_or("missing".to_string(), |k| k.to_string()),
                    kind.map_or("missing".to_string(), |k| k.to_string()),
                )));
            }
            if self.possible_values(own) != other.possible_values(index) {
                return Err(PhonixError::UnsupportedSchema(format!(
                    "feature {} has a different value table in the target schema",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Names of all features in index order
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.bytes
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.shorts.iter().map(|f| f.name.as_str()))
            .chain(self.continuous.iter().map(|f| f.name.as_str()))
    }
}

impl PartialEq for FeatureDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.shorts == other.shorts && self.continuous == other.continuous
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn phone_schema() -> FeatureDefinition {
        FeatureDefinition::new(
            vec![
                DiscreteFeature::new("phone", ["0", "_", "a", "t"]),
                DiscreteFeature::new("stressed", ["0", "1"]).with_weight(2.0),
            ],
            vec![DiscreteFeature::new("word", ["0", "hello", "world"])],
            vec![ContinuousFeature::new("f0")],
        )
        .unwrap()
    }

    #[test]
    fn test_global_indices() {
        let def = phone_schema();
        assert_eq!(def.num_features(), 4);
        assert_eq!(def.feature_index("phone"), Some(0));
        assert_eq!(def.feature_index("word"), Some(2));
        assert_eq!(def.feature_index("f0"), Some(3));
        assert_eq!(def.kind(1), Some(FeatureKind::Byte));
        assert_eq!(def.kind(2), Some(FeatureKind::Short));
        assert_eq!(def.kind(3), Some(FeatureKind::Continuous));
        assert_eq!(def.kind(4), None);
        assert_eq!(def.feature_name(3), Some("f0"));
        assert_eq!(def.weight(1), Some(2.0));
        assert!(!def.has_feature("pitch"));
    }

    #[test]
    fn test_value_lookups() {
        let def = phone_schema();
        assert_eq!(def.value_as_byte(0, "a"), Some(2));
        assert_eq!(def.value_as_byte(0, "x"), None);
        assert_eq!(def.value_as_byte(2, "hello"), None);
        assert_eq!(def.value_as_short(2, "world"), Some(2));
        assert_eq!(def.value_as_string(0, 3), Some("t"));
        assert_eq!(def.value_as_string(0, 9), None);
        assert_eq!(def.value_as_string(3, 0), None);
        assert_eq!(def.number_of_values(0), 4);
        assert_eq!(def.number_of_values(3), 0);
    }

    #[test]
    fn test_binary_roundtrip() {
        let def = phone_schema();
        let mut out = Vec::new();
        def.write(&mut out).unwrap();
        let parsed = FeatureDefinition::parse(&mut &out[..]).unwrap();
        assert_eq!(parsed, def);
        assert_eq!(parsed.feature_index("f0"), Some(3));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = FeatureDefinition::new(
            vec![DiscreteFeature::new("phone", ["0"])],
            vec![DiscreteFeature::new("phone", ["0"])],
            vec![],
        );
        assert!(matches!(result, Err(PhonixError::InvalidArgument(_))));
    }

    #[test]
    fn test_truncated_schema() {
        let mut out = Vec::new();
        phone_schema().write(&mut out).unwrap();
        out.truncate(out.len() - 3);
        assert!(matches!(
            FeatureDefinition::parse(&mut &out[..]),
            Err(PhonixError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_contains() {
        let def = phone_schema();
        let sub = FeatureDefinition::new(
            vec![DiscreteFeature::new("phone", ["0", "_", "a", "t"])],
            vec![],
            vec![ContinuousFeature::new("f0")],
        )
        .unwrap();
        assert!(def.contains(&sub));
        assert!(!sub.contains(&def));

        let other_values = FeatureDefinition::new(
            vec![DiscreteFeature::new("phone", ["0", "a"])],
            vec![],
            vec![],
        )
        .unwrap();
        assert!(!def.contains(&other_values));

        let other_kind = FeatureDefinition::new(
            vec![],
            vec![DiscreteFeature::new("stressed", ["0", "1"])],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            def.check_contains(&other_kind),
            Err(PhonixError::UnsupportedSchema(_))
        ));
    }
}
