//! Feature vectors
//!
//! Record layout follows the schema: one u8 per byte feature, one i16 per
//! short feature, one f32 per continuous feature.

use bytes::{Buf, BufMut};

use phonix_core::{PhonixError, PhonixResult, StructuredBuf};

use crate::{FeatureDefinition, FeatureKind};

/// Feature values of one unit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    /// Index of the unit this vector describes
    pub unit_index: usize,
    pub bytes: Vec<u8>,
    pub shorts: Vec<i16>,
    pub floats: Vec<f32>,
}

impl FeatureVector {
    /// Build a vector, checking its layout against `def`.
    pub fn new(
        def: &FeatureDefinition,
        unit_index: usize,
        bytes: Vec<u8>,
        shorts: Vec<i16>,
        floats: Vec<f32>,
    ) -> PhonixResult<Self> {
        if bytes.len() != def.num_byte_features()
            || shorts.len() != def.num_short_features()
            || floats.len() != def.num_continuous_features()
        {
            return Err(PhonixError::InvalidArgument(format!(
                "expected {} bytes, {} shorts and {} floats, got {}, {} and {}",
                def.num_byte_features(),
                def.num_short_features(),
                def.num_continuous_features(),
                bytes.len(),
                shorts.len(),
                floats.len()
            )));
        }
        Ok(FeatureVector {
            unit_index,
            bytes,
            shorts,
            floats,
        })
    }

    /// Vector with every discrete feature set to its null value and every
    /// continuous feature set to zero. Features without a null value get
    /// code 0.
    pub fn null(def: &FeatureDefinition, unit_index: usize) -> Self {
        let nb = def.num_byte_features();
        let code = |i: usize| def.value_code(i, crate::NULL_VALUE).unwrap_or(0);
        FeatureVector {
            unit_index,
            bytes: (0..nb).map(|i| code(i) as u8).collect(),
            shorts: (0..def.num_short_features())
                .map(|i| code(nb + i) as i16)
                .collect(),
            floats: vec![0.0; def.num_continuous_features()],
        }
    }

    pub(crate) fn parse(def: &FeatureDefinition, unit_index: usize, buf: &mut impl Buf) -> PhonixResult<Self> {
        let nb = def.num_byte_features();
        buf.require(nb, "byte features")?;
        let mut bytes = vec![0u8; nb];
        buf.copy_to_slice(&mut bytes);
        let shorts = buf.read_i16_vec(def.num_short_features(), "short features")?;
        let floats = buf.read_f32_vec(def.num_continuous_features(), "continuous features")?;
        Ok(FeatureVector {
            unit_index,
            bytes,
            shorts,
            floats,
        })
    }

    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.bytes);
        for &s in &self.shorts {
            buf.put_i16(s);
        }
        for &f in &self.floats {
            buf.put_f32(f);
        }
    }

    #[inline]
    pub fn serialized_size(&self) -> usize {
        self.bytes.len() + 2 * self.shorts.len() + 4 * self.floats.len()
    }

    /// Code of a discrete feature, by global index.
    pub fn discrete(&self, index: usize) -> Option<i32> {
        let nb = self.bytes.len();
        if index < nb {
            Some(self.bytes[index] as i32)
        } else {
            self.shorts.get(index - nb).map(|&s| s as i32)
        }
    }

    /// Value of a continuous feature, by global index.
    pub fn continuous(&self, index: usize) -> Option<f32> {
        let offset = self.bytes.len() + self.shorts.len();
        index.checked_sub(offset).and_then(|i| self.floats.get(i).copied())
    }

    /// String value of a discrete feature.
    pub fn value_as_string<'d>(&self, def: &'d FeatureDefinition, index: usize) -> Option<&'d str> {
        match def.kind(index)? {
            FeatureKind::Continuous => None,
            _ => def.value_as_string(index, self.discrete(index)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::tests::phone_schema;

    #[test]
    fn test_layout_checked() {
        let def = phone_schema();
        assert!(FeatureVector::new(&def, 0, vec![1, 0], vec![2], vec![0.5]).is_ok());
        assert!(matches!(
            FeatureVector::new(&def, 0, vec![1], vec![2], vec![0.5]),
            Err(PhonixError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_global_access() {
        let def = phone_schema();
        let fv = FeatureVector::new(&def, 7, vec![2, 1], vec![1], vec![120.0]).unwrap();
        assert_eq!(fv.discrete(0), Some(2));
        assert_eq!(fv.discrete(2), Some(1));
        assert_eq!(fv.discrete(3), None);
        assert_eq!(fv.continuous(3), Some(120.0));
        assert_eq!(fv.continuous(0), None);
        assert_eq!(fv.value_as_string(&def, 0), Some("a"));
        assert_eq!(fv.value_as_string(&def, 2), Some("hello"));
        assert_eq!(fv.value_as_string(&def, 3), None);
    }

    #[test]
    fn test_binary_roundtrip() {
        let def = phone_schema();
        let fv = FeatureVector::new(&def, 3, vec![3, 1], vec![-2], vec![1.25]).unwrap();
        let mut out = Vec::new();
        fv.write(&mut out);
        assert_eq!(out.len(), fv.serialized_size());
        assert_eq!(FeatureVector::parse(&def, 3, &mut &out[..]).unwrap(), fv);
        assert!(FeatureVector::parse(&def, 3, &mut &out[..4]).is_err());
    }

    #[test]
    fn test_null_vector() {
        let def = phone_schema();
        let fv = FeatureVector::null(&def, 0);
        assert_eq!(fv.value_as_string(&def, 0), Some("0"));
        assert_eq!(fv.value_as_string(&def, 2), Some("0"));
        assert_eq!(fv.floats, vec![0.0]);
    }
}
