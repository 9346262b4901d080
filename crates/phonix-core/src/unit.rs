//! Units and the unit file
//!
//! A unit is one selectable interval of a voice's timelines. Units live in one
//! contiguous array per voice; a unit's index is its array position.
//!
//! Unit file layout (big-endian):
//! - File header (type UNITS)
//! - i32 number of units
//! - i32 sample rate
//! - per unit: i64 start time, i32 duration (samples)

use std::path::Path;

use bytes::{Buf, BufMut};

use crate::{FileHeader, FileType, PhonixError, PhonixResult, StructuredBuf};

/// Serialized size of one unit record
pub const UNIT_RECORD_SIZE: usize = 12;

/// One selectable interval of recorded speech
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unit {
    /// Position in the voice's unit array
    pub index: usize,
    /// Start time in samples
    pub start_time: i64,
    /// Duration in samples
    pub duration: i64,
}

impl Unit {
    #[inline]
    pub fn new(index: usize, start_time: i64, duration: i64) -> Self {
        Unit {
            index,
            start_time,
            duration,
        }
    }

    #[inline]
    pub fn end_time(&self) -> i64 {
        self.start_time + self.duration
    }

    /// Edge units mark sentence boundaries and cover no samples.
    #[inline]
    pub fn is_edge(&self) -> bool {
        self.duration == 0
    }
}

/// A voice's unit array, loaded fully into memory
#[derive(Clone, Debug)]
pub struct UnitFile {
    sample_rate: i32,
    units: Vec<Unit>,
}

impl UnitFile {
    /// Build a unit file from `(start_time, duration)` pairs.
    pub fn new(sample_rate: i32, spans: &[(i64, i64)]) -> PhonixResult<Self> {
        if sample_rate <= 0 {
            return Err(PhonixError::InvalidArgument(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        let units = spans
            .iter()
            .enumerate()
            .map(|(i, &(start, dur))| Unit::new(i, start, dur))
            .collect();
        Ok(UnitFile { sample_rate, units })
    }

    pub fn load(path: impl AsRef<Path>) -> PhonixResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file = Self::parse(&mut &data[..])?;
        tracing::info!(
            "loaded {} units at {} Hz from {}",
            file.units.len(),
            file.sample_rate,
            path.display()
        );
        Ok(file)
    }

    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        FileHeader::expect(buf, &[FileType::Units])?;
        let count = buf.read_count("number of units")?;
        let sample_rate = buf.read_i32("sample rate")?;
        if sample_rate <= 0 {
            return Err(PhonixError::MalformedFile(format!(
                "illegal sample rate {}",
                sample_rate
            )));
        }
        buf.require(count.saturating_mul(UNIT_RECORD_SIZE), "unit records")?;

        let mut units = Vec::with_capacity(count);
        for index in 0..count {
            let start_time = buf.get_i64();
            let duration = buf.get_i32() as i64;
            if start_time < 0 || duration < 0 {
                return Err(PhonixError::MalformedFile(format!(
                    "unit {} has negative start {} or duration {}",
                    index, start_time, duration
                )));
            }
            units.push(Unit::new(index, start_time, duration));
        }
        Ok(UnitFile { sample_rate, units })
    }

    pub fn write(&self, buf: &mut impl BufMut) -> PhonixResult<()> {
        FileHeader::new(FileType::Units).write(buf);
        buf.put_i32(self.units.len() as i32);
        buf.put_i32(self.sample_rate);
        for unit in &self.units {
            let duration = i32::try_from(unit.duration).map_err(|_| {
                PhonixError::InvalidArgument(format!(
                    "unit {} duration {} does not fit the unit file",
                    unit.index, unit.duration
                ))
            })?;
            buf.put_i64(unit.start_time);
            buf.put_i32(duration);
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PhonixResult<()> {
        let mut out = Vec::with_capacity(20 + self.units.len() * UNIT_RECORD_SIZE);
        self.write(&mut out)?;
        std::fs::write(path, out)?;
        Ok(())
    }

    #[inline]
    pub fn sample_rate(&self) -> i32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get a unit by index
    pub fn unit(&self, index: usize) -> PhonixResult<Unit> {
        self.units
            .get(index)
            .copied()
            .ok_or(PhonixError::OutOfRange {
                what: "unit",
                index: index as i64,
                len: self.units.len(),
            })
    }

    /// Get a unit by index, `None` past either end
    #[inline]
    pub fn get(&self, index: usize) -> Option<Unit> {
        self.units.get(index).copied()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }
}
