//! Sparse time index
//!
//! Index zone layout (big-endian):
//! - i32 number of entries
//! - i32 index interval in samples (> 0)
//! - per entry: i64 byte pointer, i64 time pointer
//!
//! Entry `i` points at the datagram containing time `i * interval`, or at an
//! earlier one: never after. Readers can only hop forward from an entry, so
//! this at-or-before property is what makes every lookup terminate on the
//! right datagram.

use bytes::{Buf, BufMut};

use phonix_core::{PhonixError, PhonixResult, StructuredBuf};

/// Serialized size of one index entry
pub const INDEX_ENTRY_SIZE: usize = 16;

/// One (byte, time) pointer pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute file offset of a datagram record
    pub byte_ptr: i64,
    /// Start time of that datagram, in timeline samples
    pub time_ptr: i64,
}

impl IndexEntry {
    #[inline]
    pub fn new(byte_ptr: i64, time_ptr: i64) -> Self {
        IndexEntry { byte_ptr, time_ptr }
    }
}

/// Fixed-interval time index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeIndex {
    interval: i64,
    entries: Vec<IndexEntry>,
}

impl TimeIndex {
    /// Build an index, enforcing a positive interval, a first entry at time
    /// zero and non-decreasing, non-negative pointers.
    pub fn new(interval: i32, entries: Vec<IndexEntry>) -> PhonixResult<Self> {
        if interval <= 0 {
            return Err(PhonixError::MalformedFile(format!(
                "index interval must be positive, got {}",
                interval
            )));
        }
        if entries.is_empty() {
            return Err(PhonixError::MalformedFile("time index has no entries".into()));
        }
        if entries[0].time_ptr != 0 {
            return Err(PhonixError::malformed(format!(
                "first index entry must point at time 0, got {}",
                entries[0].time_ptr
            )));
        }
        for (i, pair) in entries.windows(2).enumerate() {
            if pair[1].byte_ptr < pair[0].byte_ptr || pair[1].time_ptr < pair[0].time_ptr {
                return Err(PhonixError::MalformedFile(format!(
                    "index pointers decrease at entry {}: {:?} -> {:?}",
                    i + 1,
                    pair[0],
                    pair[1]
                )));
            }
        }
        for (i, entry) in entries.iter().enumerate() {
            if entry.time_ptr < 0 {
                return Err(PhonixError::malformed(format!(
                    "index entry {} has negative time {}",
                    i, entry.time_ptr
                )));
            }
            if entry.time_ptr > i as i64 * interval as i64 {
                return Err(PhonixError::MalformedFile(format!(
                    "index entry {} points after its tick: time {} > {}",
                    i,
                    entry.time_ptr,
                    i as i64 * interval as i64
                )));
            }
        }
        Ok(TimeIndex {
            interval: interval as i64,
            entries,
        })
    }

    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        let count = buf.read_count("index entry count")?;
        let interval = buf.read_i32("index interval")?;
        buf.require(count.saturating_mul(INDEX_ENTRY_SIZE), "index entries")?;
        let entries = (0..count)
            .map(|_| {
                let byte_ptr = buf.get_i64();
                let time_ptr = buf.get_i64();
                IndexEntry::new(byte_ptr, time_ptr)
            })
            .collect();
        Self::new(interval, entries)
    }

    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_i32(self.entries.len() as i32);
        buf.put_i32(self.interval as i32);
        for entry in &self.entries {
            buf.put_i64(entry.byte_ptr);
            buf.put_i64(entry.time_ptr);
        }
    }

    #[inline]
    pub fn serialized_size(&self) -> usize {
        8 + self.entries.len() * INDEX_ENTRY_SIZE
    }

    #[inline]
    pub fn interval(&self) -> i64 {
        self.interval
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, i: usize) -> Option<IndexEntry> {
        self.entries.get(i).copied()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entry at or before `time`: `floor(time / interval)`, clamped to the
    /// last entry. O(1).
    pub fn entry_before(&self, time: i64) -> PhonixResult<IndexEntry> {
        if time < 0 {
            return Err(PhonixError::NegativeTime(time));
        }
        let i = ((time / self.interval) as usize).min(self.entries.len() - 1);
        Ok(self.entries[i])
    }
}
