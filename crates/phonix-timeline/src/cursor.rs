//! Forward-only datagram cursor over a byte source
//!
//! Each query owns its cursor. The cursor keeps one window of bytes and
//! refills it from the source when the next record does not fit, so the
//! same code drives mapped sources (one window, never refilled) and
//! piecewise sources (bounded windows, refilled on demand).

use bytes::Bytes;

use phonix_core::{PhonixError, PhonixResult};
use phonix_datagram::{Datagram, DatagramHeader, DATAGRAM_HEADER_SIZE};

use crate::ByteSource;

pub(crate) struct DatagramCursor<'a> {
    source: &'a dyn ByteSource,
    window: Bytes,
    window_start: u64,
    /// Zone offset of the next record
    pos: u64,
}

impl<'a> DatagramCursor<'a> {
    pub(crate) fn new(source: &'a dyn ByteSource, pos: u64) -> Self {
        DatagramCursor {
            source,
            window: Bytes::new(),
            window_start: pos,
            pos,
        }
    }

    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    /// Make `n` bytes at the current position available in the window.
    fn ensure(&mut self, n: usize) -> PhonixResult<usize> {
        let window_end = self.window_start + self.window.len() as u64;
        if self.pos < self.window_start || self.pos + n as u64 > window_end {
            self.window = self.source.window(self.pos, n)?;
            self.window_start = self.pos;
        }
        let offset = (self.pos - self.window_start) as usize;
        if self.window.len() - offset < n {
            return Err(PhonixError::Truncated {
                offset: self.pos,
                needed: n as u64,
                available: (self.window.len() - offset) as u64,
            });
        }
        Ok(offset)
    }

    /// Header of the next record, `None` at the end of the zone.
    ///
    /// A record whose length runs past the zone is corruption, not the end.
    pub(crate) fn peek_header(&mut self) -> PhonixResult<Option<DatagramHeader>> {
        let zone_len = self.source.len();
        if self.pos >= zone_len {
            return Ok(None);
        }
        let offset = self.ensure(DATAGRAM_HEADER_SIZE)?;
        let header = DatagramHeader::parse(&self.window[offset..])?;
        if header.duration <= 0 {
            return Err(PhonixError::MalformedFile(format!(
                "datagram at zone offset {} has non-positive duration {}",
                self.pos, header.duration
            )));
        }
        let end = self.pos + header.record_size() as u64;
        if end > zone_len {
            return Err(PhonixError::Truncated {
                offset: self.pos,
                needed: header.record_size() as u64,
                available: zone_len - self.pos,
            });
        }
        Ok(Some(header))
    }

    /// Skip a record whose header was just peeked.
    #[inline]
    pub(crate) fn skip(&mut self, header: &DatagramHeader) {
        self.pos += header.record_size() as u64;
    }

    /// Read the next record, `None` at the end of the zone.
    pub(crate) fn next_datagram(&mut self) -> PhonixResult<Option<Datagram>> {
        let Some(header) = self.peek_header()? else {
            return Ok(None);
        };
        let offset = self.ensure(header.record_size())?;
        let start = offset + DATAGRAM_HEADER_SIZE;
        let data = self.window.slice(start..start + header.length);
        self.skip(&header);
        Ok(Some(Datagram {
            duration: header.duration,
            data,
        }))
    }
}
