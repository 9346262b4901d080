//! Feature file
//!
//! Layout (big-endian):
//! - File header (type UNITFEATS or HALFPHONE_UNITFEATS)
//! - Feature definition block
//! - i32 number of units
//! - one feature vector per unit, in unit order

use std::path::Path;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use phonix_core::{FileHeader, FileType, PhonixError, PhonixResult, StructuredBuf};

use crate::{FeatureDefinition, FeatureKind, FeatureVector};

/// Loaded feature store: one vector per unit under one schema
#[derive(Clone, Debug)]
pub struct FeatureFile {
    definition: Arc<FeatureDefinition>,
    halfphone: bool,
    vectors: Vec<FeatureVector>,
}

impl FeatureFile {
    pub fn load(path: impl AsRef<Path>) -> PhonixResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file = Self::parse(&mut &data[..])?;
        tracing::info!(
            "loaded {} feature vectors ({} features{}) from {}",
            file.len(),
            file.definition.num_features(),
            if file.halfphone { ", half-phone" } else { "" },
            path.display()
        );
        Ok(file)
    }

    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        let header = FileHeader::expect(buf, &[FileType::UnitFeatures, FileType::HalfPhoneUnitFeatures])?;
        let definition = FeatureDefinition::parse(buf)?;
        let count = buf.read_count("number of units")?;
        let mut vectors = Vec::with_capacity(count.min(1 << 20));
        for i in 0..count {
            vectors.push(FeatureVector::parse(&definition, i, buf)?);
        }
        Ok(FeatureFile {
            definition: Arc::new(definition),
            halfphone: header.file_type == FileType::HalfPhoneUnitFeatures,
            vectors,
        })
    }

    pub fn write(&self, buf: &mut impl BufMut) -> PhonixResult<()> {
        let file_type = if self.halfphone {
            FileType::HalfPhoneUnitFeatures
        } else {
            FileType::UnitFeatures
        };
        FileHeader::new(file_type).write(buf);
        self.definition.write(buf)?;
        buf.put_i32(self.vectors.len() as i32);
        for v in &self.vectors {
            v.write(buf);
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PhonixResult<()> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        std::fs::write(path, out)?;
        Ok(())
    }

    pub fn definition(&self) -> &FeatureDefinition {
        &self.definition
    }

    /// Shared handle to the schema
    pub fn shared_definition(&self) -> Arc<FeatureDefinition> {
        Arc::clone(&self.definition)
    }

    /// Whether vectors describe half-phone units
    #[inline]
    pub fn is_halfphone(&self) -> bool {
        self.halfphone
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn feature_vector(&self, unit_index: usize) -> PhonixResult<&FeatureVector> {
        self.vectors.get(unit_index).ok_or(PhonixError::OutOfRange {
            what: "feature vector",
            index: unit_index as i64,
            len: self.vectors.len(),
        })
    }

    pub fn feature_vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    /// String value of feature `index` for a unit. `None` for continuous
    /// features or codes outside the value table.
    pub fn value_as_string(&self, unit_index: usize, index: usize) -> PhonixResult<Option<&str>> {
        Ok(self.feature_vector(unit_index)?.value_as_string(&self.definition, index))
    }

    /// Re-express every vector under `schema`, which must be a sub-schema of
    /// this store's. Unit order is kept.
    pub fn project_onto(&self, schema: &FeatureDefinition) -> PhonixResult<FeatureFile> {
        self.definition.check_contains(schema)?;
        let source = |index: usize| -> PhonixResult<usize> {
            let name = schema.feature_name(index).unwrap_or_default();
            self.definition.feature_index(name).ok_or_else(|| {
                PhonixError::UnsupportedSchema(format!("feature {} is not in the source schema", name))
            })
        };
        let nb = schema.num_byte_features();
        let ns = schema.num_short_features();
        let byte_map = (0..nb).map(&source).collect::<PhonixResult<Vec<_>>>()?;
        let short_map = (nb..nb + ns).map(&source).collect::<PhonixResult<Vec<_>>>()?;
        let float_map = (nb + ns..schema.num_features())
            .map(&source)
            .collect::<PhonixResult<Vec<_>>>()?;

        let own_nb = self.definition.num_byte_features();
        let own_offset = own_nb + self.definition.num_short_features();
        let vectors = self
            .vectors
            .iter()
            .map(|v| FeatureVector {
                unit_index: v.unit_index,
                bytes: byte_map.iter().map(|&i| v.bytes[i]).collect(),
                shorts: short_map.iter().map(|&i| v.shorts[i - own_nb]).collect(),
                floats: float_map.iter().map(|&i| v.floats[i - own_offset]).collect(),
            })
            .collect();

        Ok(FeatureFile {
            definition: Arc::new(schema.clone()),
            halfphone: self.halfphone,
            vectors,
        })
    }
}

/// Builds feature files vector by vector
#[derive(Debug)]
pub struct FeatureFileWriter {
    definition: FeatureDefinition,
    halfphone: bool,
    vectors: Vec<FeatureVector>,
}

impl FeatureFileWriter {
    pub fn new(definition: FeatureDefinition, halfphone: bool) -> Self {
        FeatureFileWriter {
            definition,
            halfphone,
            vectors: Vec::new(),
        }
    }

    pub fn definition(&self) -> &FeatureDefinition {
        &self.definition
    }

    /// Append the vector of the next unit.
    pub fn push(&mut self, bytes: Vec<u8>, shorts: Vec<i16>, floats: Vec<f32>) -> PhonixResult<()> {
        let fv = FeatureVector::new(&self.definition, self.vectors.len(), bytes, shorts, floats)?;
        self.vectors.push(fv);
        Ok(())
    }

    /// Append a vector given as `(feature name, value)` pairs. Discrete
    /// values are looked up in the value tables; unnamed features keep
    /// their null value.
    pub fn push_values(&mut self, values: &[(&str, &str)]) -> PhonixResult<()> {
        let def = &self.definition;
        let mut fv = FeatureVector::null(def, self.vectors.len());
        for &(name, value) in values {
            let index = def.feature_index(name).ok_or_else(|| {
                PhonixError::InvalidArgument(format!("unknown feature {}", name))
            })?;
            let unknown = || PhonixError::InvalidArgument(format!("feature {} has no value {:?}", name, value));
            match def.kind(index) {
                Some(FeatureKind::Byte) => {
                    fv.bytes[index] = def.value_as_byte(index, value).ok_or_else(unknown)?;
                }
                Some(FeatureKind::Short) => {
                    fv.shorts[index - def.num_byte_features()] =
                        def.value_as_short(index, value).ok_or_else(unknown)?;
                }
                Some(FeatureKind::Continuous) => {
                    let offset = def.num_byte_features() + def.num_short_features();
                    fv.floats[index - offset] = value.parse().map_err(|_| unknown())?;
                }
                None => return Err(unknown()),
            }
        }
        self.vectors.push(fv);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn finish(self) -> FeatureFile {
        FeatureFile {
            definition: Arc::new(self.definition),
            halfphone: self.halfphone,
            vectors: self.vectors,
        }
    }

    pub fn save(self, path: impl AsRef<Path>) -> PhonixResult<FeatureFile> {
        let file = self.finish();
        file.save(path)?;
        Ok(file)
    }
}
