//! Timeline writer
//!
//! Datagrams are appended in time order. Index entries are generated on the
//! fly: each tick `k * interval` gets the datagram whose span contains it.
//! The dimensions block is written as a placeholder and patched on finish.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use phonix_core::{PhonixError, PhonixResult, Properties};
use phonix_datagram::{Codec, Datagram, Payload};

use crate::{IndexEntry, TimeIndex, TimelineHeader};

/// Streaming timeline writer
pub struct TimelineWriter<W: Write + Seek> {
    out: W,
    header: TimelineHeader,
    codec: Codec,
    interval: i64,
    entries: Vec<IndexEntry>,
    /// Absolute file offset of the next record
    byte_pos: i64,
    /// Start time of the next record
    time_pos: i64,
}

impl TimelineWriter<BufWriter<File>> {
    /// Create (or truncate) a timeline file.
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: i32,
        idx_interval: i32,
        codec: &Codec,
    ) -> PhonixResult<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), sample_rate, idx_interval, codec)
    }
}

impl<W: Write + Seek> TimelineWriter<W> {
    /// Start a timeline whose processing header declares `codec`.
    pub fn new(out: W, sample_rate: i32, idx_interval: i32, codec: &Codec) -> PhonixResult<Self> {
        Self::with_properties(out, sample_rate, idx_interval, codec.to_properties())
    }

    /// Start a timeline with an explicit processing header. The codec is
    /// derived from it, so the header must be readable back.
    pub fn with_properties(
        mut out: W,
        sample_rate: i32,
        idx_interval: i32,
        props: Properties,
    ) -> PhonixResult<Self> {
        if sample_rate <= 0 {
            return Err(PhonixError::InvalidArgument(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if idx_interval <= 0 {
            return Err(PhonixError::InvalidArgument(format!(
                "index interval must be positive, got {}",
                idx_interval
            )));
        }
        let codec = Codec::from_properties(&props)?;
        let processing = props.to_string();
        let mut header = TimelineHeader {
            processing,
            sample_rate,
            num_datagrams: 0,
            datagrams_byte_pos: 0,
            time_idx_byte_pos: 0,
        };
        header.datagrams_byte_pos = header.serialized_size() as i64;

        let mut buf = Vec::with_capacity(header.serialized_size());
        header.write(&mut buf)?;
        out.write_all(&buf)?;

        let byte_pos = header.datagrams_byte_pos;
        Ok(TimelineWriter {
            out,
            header,
            codec,
            interval: idx_interval as i64,
            entries: Vec::new(),
            byte_pos,
            time_pos: 0,
        })
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Datagrams written so far
    #[inline]
    pub fn num_datagrams(&self) -> i64 {
        self.header.num_datagrams
    }

    /// Time covered so far, in samples
    #[inline]
    pub fn total_duration(&self) -> i64 {
        self.time_pos
    }

    /// Append one datagram.
    pub fn feed(&mut self, datagram: &Datagram) -> PhonixResult<()> {
        if datagram.duration <= 0 {
            return Err(PhonixError::InvalidArgument(format!(
                "datagram duration must be positive, got {}",
                datagram.duration
            )));
        }
        let end = self.time_pos + datagram.duration;
        while (self.entries.len() as i64) * self.interval < end {
            self.entries.push(IndexEntry::new(self.byte_pos, self.time_pos));
        }
        let record = datagram.to_bytes()?;
        self.out.write_all(&record)?;
        self.byte_pos += record.len() as i64;
        self.time_pos = end;
        self.header.num_datagrams += 1;
        Ok(())
    }

    /// Encode a payload with this timeline's codec and append it.
    pub fn feed_payload(&mut self, duration: i64, payload: &Payload) -> PhonixResult<()> {
        let datagram = self.codec.encode(duration, payload)?;
        self.feed(&datagram)
    }

    /// Write the index, patch the dimensions and hand back the output.
    pub fn finish(mut self) -> PhonixResult<W> {
        if self.entries.is_empty() {
            self.entries.push(IndexEntry::new(self.byte_pos, 0));
        }
        self.header.time_idx_byte_pos = self.byte_pos;
        let index = TimeIndex::new(self.interval as i32, std::mem::take(&mut self.entries))?;

        let mut buf = Vec::with_capacity(index.serialized_size());
        index.write(&mut buf);
        self.out.write_all(&buf)?;

        let mut head = Vec::with_capacity(self.header.serialized_size());
        self.header.write(&mut head)?;
        let dims = self.header.dimensions_pos();
        self.out.seek(SeekFrom::Start(dims as u64))?;
        self.out.write_all(&head[dims..])?;
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;

        tracing::debug!(
            "wrote timeline: {} datagrams, {} samples, {} index entries",
            self.header.num_datagrams,
            self.time_pos,
            index.len()
        );
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimelineReader;
    use std::io::Cursor;

    #[test]
    fn test_index_entries_at_or_before_ticks() {
        let mut writer = TimelineWriter::new(Cursor::new(Vec::new()), 16000, 100, &Codec::Raw).unwrap();
        for d in [30, 250, 10, 400] {
            writer.feed(&Datagram::new(d, vec![0u8; 2])).unwrap();
        }
        assert_eq!(writer.total_duration(), 690);
        let reader = TimelineReader::from_bytes(writer.finish().unwrap().into_inner().into()).unwrap();
        let index = reader.index();
        // Ticks 0..=600: seven entries
        assert_eq!(index.len(), 7);
        let starts: Vec<i64> = index.entries().iter().map(|e| e.time_ptr).collect();
        assert_eq!(starts, vec![0, 30, 30, 290, 290, 290, 290]);
        for (k, e) in index.entries().iter().enumerate() {
            assert!(e.time_ptr <= k as i64 * 100);
        }
    }

    #[test]
    fn test_empty_timeline() {
        let writer = TimelineWriter::new(Cursor::new(Vec::new()), 16000, 100, &Codec::Raw).unwrap();
        let reader = TimelineReader::from_bytes(writer.finish().unwrap().into_inner().into()).unwrap();
        assert_eq!(reader.num_datagrams(), 0);
        assert_eq!(reader.index().len(), 1);
        assert_eq!(reader.total_duration().unwrap(), 0);
        assert!(reader.get_datagram(0).unwrap().is_none());
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let mut writer = TimelineWriter::new(Cursor::new(Vec::new()), 16000, 100, &Codec::Raw).unwrap();
        assert!(matches!(
            writer.feed(&Datagram::new(0, Vec::new())),
            Err(PhonixError::InvalidArgument(_))
        ));
        assert!(writer.feed(&Datagram::new(-4, Vec::new())).is_err());
        assert_eq!(writer.num_datagrams(), 0);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(TimelineWriter::new(Cursor::new(Vec::new()), 0, 100, &Codec::Raw).is_err());
        assert!(TimelineWriter::new(Cursor::new(Vec::new()), 16000, 0, &Codec::Raw).is_err());
    }

    #[test]
    fn test_custom_properties_preserved() {
        let props = Properties::new().with("payload", "float").with("source", "unit test");
        let mut writer = TimelineWriter::with_properties(Cursor::new(Vec::new()), 100, 10, props).unwrap();
        writer.feed_payload(4, &Payload::FloatArray(vec![0.25])).unwrap();
        let reader = TimelineReader::from_bytes(writer.finish().unwrap().into_inner().into()).unwrap();
        assert_eq!(reader.properties().get("source"), Some("unit test"));
        assert_eq!(reader.codec(), &Codec::FloatArray);
    }

    #[test]
    fn test_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.bin");
        let mut writer = TimelineWriter::create(&path, 8000, 50, &Codec::Raw).unwrap();
        writer.feed(&Datagram::new(80, b"pcm".to_vec())).unwrap();
        writer.finish().unwrap();
        let reader = TimelineReader::open(&path).unwrap();
        assert_eq!(reader.sample_rate(), 8000);
        assert_eq!(&reader.get_datagram(79).unwrap().unwrap().data[..], b"pcm");
    }
}
