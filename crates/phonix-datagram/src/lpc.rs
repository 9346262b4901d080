//! LPC codec - quantized filter coefficients + mu-law residual
//!
//! Payload layout (big-endian):
//! - `order` x i16: linearly quantized coefficients
//! - remaining bytes: mu-law residual, one byte per sample
//!
//! Timeline properties: `lpc.order`, `lpc.min`, `lpc.range`.

use bytes::{Buf, BufMut};

use phonix_core::{PhonixError, PhonixResult, Properties};

use crate::{linear_to_ulaw, ulaw_to_linear, LinearQuantizer};

/// One decoded LPC frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LpcFrame {
    /// Filter coefficients (length = order)
    pub coeffs: Vec<f32>,
    /// Excitation residual samples
    pub residual: Vec<i16>,
}

/// LPC codec parameters shared by every datagram of a timeline
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LpcCodec {
    pub order: usize,
    pub quantizer: LinearQuantizer,
}

impl LpcCodec {
    pub fn new(order: usize, min: f32, range: f32) -> PhonixResult<Self> {
        if order == 0 {
            return Err(PhonixError::InvalidArgument("LPC order must be positive".into()));
        }
        if !(range > 0.0) {
            return Err(PhonixError::InvalidArgument(format!(
                "LPC coefficient range must be positive, got {}",
                range
            )));
        }
        Ok(LpcCodec {
            order,
            quantizer: LinearQuantizer::new(min, range),
        })
    }

    pub fn from_properties(props: &Properties) -> PhonixResult<Self> {
        let order: usize = props.parse_value("lpc.order")?;
        let min: f32 = props.parse_value("lpc.min")?;
        let range: f32 = props.parse_value("lpc.range")?;
        Self::new(order, min, range)
            .map_err(|e| PhonixError::MalformedFile(format!("bad LPC properties: {}", e)))
    }

    pub fn write_properties(&self, props: &mut Properties) {
        props.set("lpc.order", self.order);
        props.set("lpc.min", self.quantizer.min);
        props.set("lpc.range", self.quantizer.range);
    }

    pub fn decode(&self, data: &[u8]) -> PhonixResult<LpcFrame> {
        let coeff_bytes = self.order * 2;
        if data.len() < coeff_bytes {
            return Err(PhonixError::MalformedFile(format!(
                "LPC payload of {} bytes cannot hold {} coefficients",
                data.len(),
                self.order
            )));
        }
        let mut buf = data;
        let coeffs = (0..self.order)
            .map(|_| self.quantizer.unquantize(buf.get_i16()))
            .collect();
        let residual = buf.iter().map(|&b| ulaw_to_linear(b)).collect();
        Ok(LpcFrame { coeffs, residual })
    }

    pub fn encode(&self, frame: &LpcFrame) -> PhonixResult<Vec<u8>> {
        if frame.coeffs.len() != self.order {
            return Err(PhonixError::InvalidArgument(format!(
                "expected {} LPC coefficients, got {}",
                self.order,
                frame.coeffs.len()
            )));
        }
        let mut buf = Vec::with_capacity(self.order * 2 + frame.residual.len());
        for &c in &frame.coeffs {
            buf.put_i16(self.quantizer.quantize(c));
        }
        buf.extend(frame.residual.iter().map(|&s| linear_to_ulaw(s)));
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ulaw_max_error;

    fn codec() -> LpcCodec {
        LpcCodec::new(4, -1.5, 3.0).unwrap()
    }

    #[test]
    fn test_lpc_roundtrip_within_bounds() {
        let codec = codec();
        let frame = LpcFrame {
            coeffs: vec![-1.2, 0.3, 0.9, 1.5],
            residual: vec![0, 120, -3000, 25000, -32000],
        };
        let bytes = codec.encode(&frame).unwrap();
        assert_eq!(bytes.len(), 4 * 2 + 5);

        let decoded = codec.decode(&bytes).unwrap();
        for (a, b) in frame.coeffs.iter().zip(&decoded.coeffs) {
            assert!((a - b).abs() <= codec.quantizer.step());
        }
        for (i, (&a, &b)) in frame.residual.iter().zip(&decoded.residual).enumerate() {
            let code = bytes[8 + i];
            assert!(((a as i32) - (b as i32)).abs() <= ulaw_max_error(code));
        }
    }

    #[test]
    fn test_lpc_wrong_order() {
        let frame = LpcFrame {
            coeffs: vec![0.0; 3],
            residual: vec![],
        };
        assert!(codec().encode(&frame).is_err());
    }

    #[test]
    fn test_lpc_short_payload() {
        assert!(matches!(
            codec().decode(&[0u8; 5]),
            Err(PhonixError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_lpc_properties() {
        let mut props = Properties::new();
        codec().write_properties(&mut props);
        let parsed = LpcCodec::from_properties(&props).unwrap();
        assert_eq!(parsed, codec());

        let bad = Properties::new()
            .with("lpc.order", 4)
            .with("lpc.min", 0)
            .with("lpc.range", 0);
        assert!(LpcCodec::from_properties(&bad).is_err());
    }
}
