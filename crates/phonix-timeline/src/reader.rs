//! Timeline reader
//!
//! Header region layout (big-endian):
//! - File header (12 bytes, type TIMELINE)
//! - Processing header: u16 length + UTF-8 `key=value` lines
//! - i32 sample rate
//! - i64 number of datagrams
//! - i64 datagram zone byte position
//! - i64 time index byte position
//!
//! The index sits after the datagram zone and runs to the end of the file.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bytes::{Buf, BufMut, Bytes};

use phonix_core::{
    put_utf, FileHeader, FileType, PhonixError, PhonixResult, Properties, StructuredBuf, Unit,
    FILE_HEADER_SIZE,
};
use phonix_datagram::{Codec, Datagram, Payload};

use crate::cursor::DatagramCursor;
use crate::{
    read_exact_at, ByteSource, IoStrategy, PiecewiseSource, SharedSource, TimeIndex,
    TimelineConfig,
};

/// Size of the dimensions block after the processing header
pub const DIMENSIONS_SIZE: usize = 28;

/// Upper bound of the header region: file header, longest processing
/// header and dimensions
const MAX_HEADER_REGION: u64 = (FILE_HEADER_SIZE + 2 + u16::MAX as usize + DIMENSIONS_SIZE) as u64;

/// Everything before the datagram zone
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineHeader {
    /// Processing header text as stored
    pub processing: String,
    pub sample_rate: i32,
    pub num_datagrams: i64,
    pub datagrams_byte_pos: i64,
    pub time_idx_byte_pos: i64,
}

impl TimelineHeader {
    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        FileHeader::expect(buf, &[FileType::Timeline])?;
        let processing = buf.read_utf("processing header")?;
        let sample_rate = buf.read_i32("sample rate")?;
        let num_datagrams = buf.read_i64("datagram count")?;
        let datagrams_byte_pos = buf.read_i64("datagram zone position")?;
        let time_idx_byte_pos = buf.read_i64("time index position")?;

        if sample_rate <= 0 {
            return Err(PhonixError::MalformedFile(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if num_datagrams < 0 {
            return Err(PhonixError::MalformedFile(format!(
                "negative datagram count {}",
                num_datagrams
            )));
        }
        let header = TimelineHeader {
            processing,
            sample_rate,
            num_datagrams,
            datagrams_byte_pos,
            time_idx_byte_pos,
        };
        if datagrams_byte_pos < header.serialized_size() as i64 {
            return Err(PhonixError::MalformedFile(format!(
                "datagram zone at {} overlaps the {}-byte header",
                datagrams_byte_pos,
                header.serialized_size()
            )));
        }
        if time_idx_byte_pos < datagrams_byte_pos {
            return Err(PhonixError::MalformedFile(format!(
                "time index at {} precedes the datagram zone at {}",
                time_idx_byte_pos, datagrams_byte_pos
            )));
        }
        Ok(header)
    }

    pub fn write(&self, buf: &mut impl BufMut) -> PhonixResult<()> {
        FileHeader::new(FileType::Timeline).write(buf);
        put_utf(buf, &self.processing)?;
        buf.put_i32(self.sample_rate);
        buf.put_i64(self.num_datagrams);
        buf.put_i64(self.datagrams_byte_pos);
        buf.put_i64(self.time_idx_byte_pos);
        Ok(())
    }

    /// Offset of the dimensions block
    #[inline]
    pub fn dimensions_pos(&self) -> usize {
        FILE_HEADER_SIZE + 2 + self.processing.len()
    }

    #[inline]
    pub fn serialized_size(&self) -> usize {
        self.dimensions_pos() + DIMENSIONS_SIZE
    }

    fn zone_len(&self) -> u64 {
        (self.time_idx_byte_pos - self.datagrams_byte_pos) as u64
    }
}

/// How much to read after the target time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extent {
    /// Number of datagrams; values below one still return one
    Count(i64),
    /// Duration to cover, in the caller's sample rate
    Span(i64),
}

/// Result of a datagram query
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatagramSpan {
    /// Start of the first returned datagram, in the caller's sample rate
    pub start_time: i64,
    /// Requested time minus `start_time`, in the caller's sample rate
    pub offset: i64,
    pub datagrams: Vec<Datagram>,
}

impl DatagramSpan {
    /// Sum of the returned durations
    pub fn duration(&self) -> i64 {
        self.datagrams.iter().map(|d| d.duration).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.datagrams.is_empty()
    }
}

/// Read-only, thread-safe access to one timeline file
pub struct TimelineReader {
    path: Option<PathBuf>,
    header: TimelineHeader,
    props: Properties,
    codec: Codec,
    index: TimeIndex,
    source: Box<dyn ByteSource>,
    total: OnceLock<i64>,
}

impl TimelineReader {
    /// Open with the default configuration: memory-mapped when possible.
    pub fn open(path: impl AsRef<Path>) -> PhonixResult<Self> {
        Self::open_with_config(path, &TimelineConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &TimelineConfig) -> PhonixResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut head = vec![0u8; file_len.min(MAX_HEADER_REGION) as usize];
        read_exact_at(&file, &mut head, 0)?;
        let header = TimelineHeader::parse(&mut &head[..])?;
        if header.time_idx_byte_pos as u64 > file_len {
            return Err(PhonixError::MalformedFile(format!(
                "time index at {} lies past the end of the {}-byte file",
                header.time_idx_byte_pos, file_len
            )));
        }

        let mut tail = vec![0u8; (file_len - header.time_idx_byte_pos as u64) as usize];
        read_exact_at(&file, &mut tail, header.time_idx_byte_pos as u64)?;
        let index = TimeIndex::parse(&mut &tail[..])?;

        let zone_start = header.datagrams_byte_pos as u64;
        let zone_len = header.zone_len();
        let source = Self::zone_source(path, file, zone_start, zone_len, config, SharedSource::map);

        let reader = Self::assemble(Some(path.to_path_buf()), header, index, source)?;
        tracing::info!(
            "loaded timeline {}: {} datagrams at {} Hz, {:?} payload, {:?} access",
            path.display(),
            reader.num_datagrams(),
            reader.sample_rate(),
            reader.codec.kind(),
            reader.strategy()
        );
        Ok(reader)
    }

    /// Source over the datagram zone: `map` when the config asks for it,
    /// piecewise reads when it doesn't or when mapping fails.
    fn zone_source(
        path: &Path,
        file: File,
        zone_start: u64,
        zone_len: u64,
        config: &TimelineConfig,
        map: impl FnOnce(&File, u64, u64) -> io::Result<SharedSource>,
    ) -> Box<dyn ByteSource> {
        if config.try_memory_map {
            match map(&file, zone_start, zone_len) {
                Ok(mapped) => return Box::new(mapped),
                Err(e) => tracing::warn!(
                    "memory mapping {} failed ({}), using piecewise reads",
                    path.display(),
                    e
                ),
            }
        }
        Box::new(PiecewiseSource::new(file, zone_start, zone_len, config.buffer_size))
    }

    /// Read a timeline held entirely in memory.
    pub fn from_bytes(data: Bytes) -> PhonixResult<Self> {
        let header = TimelineHeader::parse(&mut &data[..])?;
        if header.time_idx_byte_pos as usize > data.len() {
            return Err(PhonixError::MalformedFile(format!(
                "time index at {} lies past the end of the {}-byte buffer",
                header.time_idx_byte_pos,
                data.len()
            )));
        }
        let index = TimeIndex::parse(&mut &data[header.time_idx_byte_pos as usize..])?;
        let zone = data.slice(header.datagrams_byte_pos as usize..header.time_idx_byte_pos as usize);
        Self::assemble(None, header, index, Box::new(SharedSource::from_bytes(zone)))
    }

    fn assemble(
        path: Option<PathBuf>,
        header: TimelineHeader,
        index: TimeIndex,
        source: Box<dyn ByteSource>,
    ) -> PhonixResult<Self> {
        let props = Properties::parse(&header.processing)?;
        let codec = Codec::from_properties(&props)?;
        let first = index.entries()[0];
        if first.byte_ptr != header.datagrams_byte_pos {
            return Err(PhonixError::malformed(format!(
                "first index entry points at byte {}, datagram zone starts at {}",
                first.byte_ptr, header.datagrams_byte_pos
            )));
        }
        for (i, entry) in index.entries().iter().enumerate() {
            if entry.byte_ptr < header.datagrams_byte_pos || entry.byte_ptr > header.time_idx_byte_pos {
                return Err(PhonixError::MalformedFile(format!(
                    "index entry {} points at byte {} outside the datagram zone [{}, {}]",
                    i, entry.byte_ptr, header.datagrams_byte_pos, header.time_idx_byte_pos
                )));
            }
        }
        Ok(TimelineReader {
            path,
            header,
            props,
            codec,
            index,
            source,
            total: OnceLock::new(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn header(&self) -> &TimelineHeader {
        &self.header
    }

    /// Processing header as properties
    pub fn properties(&self) -> &Properties {
        &self.props
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    #[inline]
    pub fn sample_rate(&self) -> i32 {
        self.header.sample_rate
    }

    #[inline]
    pub fn num_datagrams(&self) -> i64 {
        self.header.num_datagrams
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn strategy(&self) -> IoStrategy {
        self.source.strategy()
    }

    /// Convert `time` between sample rates, rounding to nearest.
    fn rescale(time: i64, from_rate: i32, to_rate: i32) -> i64 {
        if from_rate == to_rate {
            return time;
        }
        let num = time as i128 * to_rate as i128;
        let den = from_rate as i128;
        ((2 * num + den) / (2 * den)) as i64
    }

    /// Cursor positioned on the datagram containing `time`, with that
    /// datagram's start time. `None` when `time` is at or past the end.
    fn seek(&self, time: i64) -> PhonixResult<Option<(DatagramCursor<'_>, i64)>> {
        let entry = self.index.entry_before(time)?;
        let zone_offset = (entry.byte_ptr - self.header.datagrams_byte_pos) as u64;
        let mut cursor = DatagramCursor::new(&*self.source, zone_offset);
        let mut start = entry.time_ptr;
        while let Some(header) = cursor.peek_header()? {
            let end = end_of(start, header.duration)?;
            if end > time {
                return Ok(Some((cursor, start)));
            }
            start = end;
            cursor.skip(&header);
        }
        Ok(None)
    }

    /// Datagrams starting with the one containing `target_time`.
    ///
    /// `target_time` and a span extent are in `req_sample_rate`; so are the
    /// returned durations. At least one datagram is returned unless the
    /// target lies at or past the end of the timeline.
    pub fn get_datagram_span(
        &self,
        target_time: i64,
        extent: Extent,
        req_sample_rate: i32,
    ) -> PhonixResult<DatagramSpan> {
        if target_time < 0 {
            return Err(PhonixError::NegativeTime(target_time));
        }
        if req_sample_rate <= 0 {
            return Err(PhonixError::InvalidArgument(format!(
                "requested sample rate must be positive, got {}",
                req_sample_rate
            )));
        }
        let rate = self.sample_rate();
        let time = Self::rescale(target_time, req_sample_rate, rate);

        let Some((mut cursor, start)) = self.seek(time)? else {
            return Ok(DatagramSpan {
                start_time: target_time,
                ..Default::default()
            });
        };

        let mut datagrams = Vec::new();
        match extent {
            Extent::Count(count) => {
                let count = count.max(1) as usize;
                while datagrams.len() < count {
                    match cursor.next_datagram()? {
                        Some(dg) => datagrams.push(dg),
                        None => break,
                    }
                }
            }
            Extent::Span(span) => {
                let end = Self::rescale(target_time.saturating_add(span.max(0)), req_sample_rate, rate);
                let mut covered = start;
                loop {
                    match cursor.next_datagram()? {
                        Some(dg) => {
                            covered = end_of(covered, dg.duration)?;
                            datagrams.push(dg);
                        }
                        None => break,
                    }
                    if covered >= end {
                        break;
                    }
                }
            }
        }

        if req_sample_rate != rate {
            for dg in &mut datagrams {
                dg.duration = Self::rescale(dg.duration, rate, req_sample_rate);
            }
        }
        let start_time = Self::rescale(start, rate, req_sample_rate);
        Ok(DatagramSpan {
            start_time,
            offset: target_time - start_time,
            datagrams,
        })
    }

    /// Datagram containing `time` (timeline rate).
    pub fn get_datagram(&self, time: i64) -> PhonixResult<Option<Datagram>> {
        self.get_datagram_at_rate(time, self.sample_rate())
    }

    pub fn get_datagram_at_rate(&self, time: i64, req_sample_rate: i32) -> PhonixResult<Option<Datagram>> {
        let span = self.get_datagram_span(time, Extent::Count(1), req_sample_rate)?;
        Ok(span.datagrams.into_iter().next())
    }

    pub fn get_datagrams_by_count(
        &self,
        time: i64,
        count: i64,
        req_sample_rate: i32,
    ) -> PhonixResult<Vec<Datagram>> {
        Ok(self
            .get_datagram_span(time, Extent::Count(count), req_sample_rate)?
            .datagrams)
    }

    pub fn get_datagrams_by_span(
        &self,
        time: i64,
        span: i64,
        req_sample_rate: i32,
    ) -> PhonixResult<Vec<Datagram>> {
        Ok(self
            .get_datagram_span(time, Extent::Span(span), req_sample_rate)?
            .datagrams)
    }

    /// Datagrams covering a unit whose times are in `unit_sample_rate`.
    /// Edge units cover no samples and yield nothing.
    pub fn get_unit_datagrams(&self, unit: &Unit, unit_sample_rate: i32) -> PhonixResult<Vec<Datagram>> {
        if unit.is_edge() {
            return Ok(Vec::new());
        }
        self.get_datagrams_by_span(unit.start_time, unit.duration, unit_sample_rate)
    }

    /// Decode a datagram with this timeline's codec.
    pub fn decode(&self, datagram: &Datagram) -> PhonixResult<Payload> {
        self.codec.decode(datagram)
    }

    /// Sum of all datagram durations, in the timeline's rate.
    ///
    /// Scans the zone once and caches the result. The scan must find
    /// exactly the declared number of datagrams.
    pub fn total_duration(&self) -> PhonixResult<i64> {
        if let Some(total) = self.total.get() {
            return Ok(*total);
        }
        let mut cursor = DatagramCursor::new(&*self.source, 0);
        let mut total = 0i64;
        let mut count = 0i64;
        while let Some(header) = cursor.peek_header()? {
            total = end_of(total, header.duration)?;
            count += 1;
            cursor.skip(&header);
        }
        if count != self.num_datagrams() {
            return Err(PhonixError::MalformedFile(format!(
                "datagram zone holds {} records, header declares {}",
                count,
                self.num_datagrams()
            )));
        }
        let _ = self.total.set(total);
        Ok(total)
    }
}

/// End time of a datagram starting at `start`
fn end_of(start: i64, duration: i64) -> PhonixResult<i64> {
    start.checked_add(duration).ok_or_else(|| {
        PhonixError::malformed(format!(
            "datagram of duration {} starting at {} overflows the time axis",
            duration, start
        ))
    })
}

impl fmt::Debug for TimelineReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineReader")
            .field("path", &self.path)
            .field("sample_rate", &self.header.sample_rate)
            .field("num_datagrams", &self.header.num_datagrams)
            .field("codec", &self.codec.kind())
            .field("strategy", &self.source.strategy())
            .finish()
    }
}
