//! Datagram record
//!
//! Record layout (big-endian):
//! - Bytes 0-7: Duration in samples (i64)
//! - Bytes 8-11: Payload length in bytes (i32)
//! - Payload (codec-specific)

use bytes::{Buf, BufMut, Bytes};

use phonix_core::{PhonixError, PhonixResult};

/// Datagram header size in bytes
pub const DATAGRAM_HEADER_SIZE: usize = 12;

/// Fixed part of a datagram record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatagramHeader {
    pub duration: i64,
    pub length: usize,
}

impl DatagramHeader {
    /// Parse the 12-byte record header.
    pub fn parse(buf: &[u8]) -> PhonixResult<Self> {
        if buf.len() < DATAGRAM_HEADER_SIZE {
            return Err(PhonixError::MalformedFile(format!(
                "datagram header needs {} bytes, got {}",
                DATAGRAM_HEADER_SIZE,
                buf.len()
            )));
        }
        let mut buf = &buf[..DATAGRAM_HEADER_SIZE];
        let duration = buf.get_i64();
        let length = buf.get_i32();
        if length < 0 {
            return Err(PhonixError::MalformedFile(format!(
                "negative datagram length {}",
                length
            )));
        }
        Ok(DatagramHeader {
            duration,
            length: length as usize,
        })
    }

    /// Size of the complete record
    #[inline]
    pub fn record_size(&self) -> usize {
        DATAGRAM_HEADER_SIZE + self.length
    }
}

/// A duration-stamped chunk of payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    /// Duration in samples (timeline rate unless rescaled by the reader)
    pub duration: i64,
    /// Encoded payload
    pub data: Bytes,
}

impl Datagram {
    pub fn new(duration: i64, data: impl Into<Bytes>) -> Self {
        Datagram {
            duration,
            data: data.into(),
        }
    }

    /// Parse one complete record from the front of `buf` without copying
    /// the payload.
    pub fn parse(buf: &mut Bytes) -> PhonixResult<Self> {
        let header = DatagramHeader::parse(buf)?;
        if buf.len() < header.record_size() {
            return Err(PhonixError::MalformedFile(format!(
                "datagram payload of {} bytes exceeds the {} bytes available",
                header.length,
                buf.len() - DATAGRAM_HEADER_SIZE
            )));
        }
        buf.advance(DATAGRAM_HEADER_SIZE);
        let data = buf.split_to(header.length);
        Ok(Datagram {
            duration: header.duration,
            data,
        })
    }

    pub fn write(&self, buf: &mut impl BufMut) -> PhonixResult<()> {
        let length = i32::try_from(self.data.len()).map_err(|_| {
            PhonixError::InvalidArgument(format!("datagram of {} bytes is too large", self.data.len()))
        })?;
        buf.put_i64(self.duration);
        buf.put_i32(length);
        buf.put_slice(&self.data);
        Ok(())
    }

    pub fn to_bytes(&self) -> PhonixResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.write(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    pub fn serialized_size(&self) -> usize {
        DATAGRAM_HEADER_SIZE + self.data.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Interpret the payload as UTF-8 text (basename timelines).
    pub fn as_text(&self) -> PhonixResult<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|_| PhonixError::MalformedFile("datagram payload is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagram_roundtrip() {
        let dg = Datagram::new(480, vec![1u8, 2, 3, 4, 5]);
        let bytes = dg.to_bytes().unwrap();
        assert_eq!(bytes.len(), DATAGRAM_HEADER_SIZE + 5);

        let mut buf = Bytes::from(bytes);
        let parsed = Datagram::parse(&mut buf).unwrap();
        assert_eq!(parsed, dg);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_consecutive_records() {
        let mut out = Vec::new();
        Datagram::new(10, vec![9u8; 3]).write(&mut out).unwrap();
        Datagram::new(20, Vec::new()).write(&mut out).unwrap();

        let mut buf = Bytes::from(out);
        assert_eq!(Datagram::parse(&mut buf).unwrap().duration, 10);
        let second = Datagram::parse(&mut buf).unwrap();
        assert_eq!(second.duration, 20);
        assert!(second.is_empty());
    }

    #[test]
    fn test_length_past_buffer() {
        let mut bytes = Datagram::new(10, vec![0u8; 8]).to_bytes().unwrap();
        bytes.truncate(bytes.len() - 1);
        let mut buf = Bytes::from(bytes);
        assert!(Datagram::parse(&mut buf).is_err());
    }

    #[test]
    fn test_negative_length() {
        let mut raw = Vec::new();
        raw.put_i64(100);
        raw.put_i32(-4);
        assert!(DatagramHeader::parse(&raw).is_err());
    }

    #[test]
    fn test_basename_text() {
        let dg = Datagram::new(16000, "arctic_a0001".as_bytes().to_vec());
        assert_eq!(dg.as_text().unwrap(), "arctic_a0001");
    }
}
