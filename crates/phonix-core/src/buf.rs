//! Checked big-endian reads over `bytes::Buf`
//!
//! `Buf::get_*` panics on underflow. Structural reads of files must fail with
//! `MalformedFile` instead, so every reader goes through `StructuredBuf`.
//!
//! Strings are written as a `u16` byte length followed by UTF-8 bytes.

use bytes::{Buf, BufMut};

use crate::{PhonixError, PhonixResult};

/// Checked structural reads. `what` names the field for error messages.
pub trait StructuredBuf: Buf {
    fn require(&self, n: usize, what: &str) -> PhonixResult<()> {
        if self.remaining() < n {
            return Err(PhonixError::MalformedFile(format!(
                "truncated while reading {}: need {} bytes, {} left",
                what,
                n,
                self.remaining()
            )));
        }
        Ok(())
    }

    fn read_u8(&mut self, what: &str) -> PhonixResult<u8> {
        self.require(1, what)?;
        Ok(self.get_u8())
    }

    fn read_i16(&mut self, what: &str) -> PhonixResult<i16> {
        self.require(2, what)?;
        Ok(self.get_i16())
    }

    fn read_i32(&mut self, what: &str) -> PhonixResult<i32> {
        self.require(4, what)?;
        Ok(self.get_i32())
    }

    fn read_u32(&mut self, what: &str) -> PhonixResult<u32> {
        self.require(4, what)?;
        Ok(self.get_u32())
    }

    fn read_i64(&mut self, what: &str) -> PhonixResult<i64> {
        self.require(8, what)?;
        Ok(self.get_i64())
    }

    fn read_f32(&mut self, what: &str) -> PhonixResult<f32> {
        self.require(4, what)?;
        Ok(self.get_f32())
    }

    /// Read a non-negative `i32` count.
    fn read_count(&mut self, what: &str) -> PhonixResult<usize> {
        let n = self.read_i32(what)?;
        if n < 0 {
            return Err(PhonixError::MalformedFile(format!(
                "negative {}: {}",
                what, n
            )));
        }
        Ok(n as usize)
    }

    fn read_f32_vec(&mut self, n: usize, what: &str) -> PhonixResult<Vec<f32>> {
        self.require(n.saturating_mul(4), what)?;
        Ok((0..n).map(|_| self.get_f32()).collect())
    }

    fn read_i16_vec(&mut self, n: usize, what: &str) -> PhonixResult<Vec<i16>> {
        self.require(n.saturating_mul(2), what)?;
        Ok((0..n).map(|_| self.get_i16()).collect())
    }

    fn read_utf(&mut self, what: &str) -> PhonixResult<String> {
        self.require(2, what)?;
        let len = self.get_u16() as usize;
        self.require(len, what)?;
        let mut raw = vec![0u8; len];
        self.copy_to_slice(&mut raw);
        String::from_utf8(raw)
            .map_err(|_| PhonixError::MalformedFile(format!("{} is not valid UTF-8", what)))
    }
}

impl<B: Buf> StructuredBuf for B {}

/// Write a length-prefixed UTF-8 string.
pub fn put_utf(buf: &mut impl BufMut, s: &str) -> PhonixResult<()> {
    let len = u16::try_from(s.len()).map_err(|_| {
        PhonixError::InvalidArgument(format!("string of {} bytes is too long", s.len()))
    })?;
    buf.put_u16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Serialized size of a length-prefixed string.
#[inline]
pub fn utf_size(s: &str) -> usize {
    2 + s.len()
}
