//! Scalar quantizers used by the lossy codecs
//!
//! - Linear 16-bit quantization over a stored `(min, range)` interval
//! - G.711 mu-law companding of 16-bit samples to 8 bits
//! - Linear 16-bit quantization of phases over [-pi, pi]

use std::f32::consts::PI;

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 32635;

/// Linear quantizer mapping `[min, min + range]` onto the full `i16` range
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearQuantizer {
    pub min: f32,
    pub range: f32,
}

impl LinearQuantizer {
    pub fn new(min: f32, range: f32) -> Self {
        LinearQuantizer { min, range }
    }

    /// Size of one quantization step; reconstruction error is at most half
    /// a step for values inside the interval.
    #[inline]
    pub fn step(&self) -> f32 {
        self.range / 65535.0
    }

    pub fn quantize(&self, value: f32) -> i16 {
        if self.range <= 0.0 {
            return i16::MIN;
        }
        let scaled = ((value - self.min) as f64) * 65535.0 / (self.range as f64) - 32768.0;
        scaled.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }

    pub fn unquantize(&self, q: i16) -> f32 {
        ((q as f64 + 32768.0) * (self.range as f64) / 65535.0 + self.min as f64) as f32
    }

    pub fn quantize_all(&self, values: &[f32]) -> Vec<i16> {
        values.iter().map(|&v| self.quantize(v)).collect()
    }

    pub fn unquantize_all(&self, values: &[i16]) -> Vec<f32> {
        values.iter().map(|&q| self.unquantize(q)).collect()
    }
}

/// Compress a 16-bit sample to 8-bit mu-law.
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut s = sample as i32;
    let sign = if s < 0 {
        s = -s;
        0x80
    } else {
        0x00
    };
    s = s.min(ULAW_CLIP) + ULAW_BIAS;
    let exponent = 31 - ((s >> 7) as u32).leading_zeros() as i32;
    let mantissa = (s >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Expand an 8-bit mu-law code to a 16-bit sample.
pub fn ulaw_to_linear(code: u8) -> i16 {
    let u = !code;
    let sign = u & 0x80;
    let exponent = ((u >> 4) & 0x07) as i32;
    let mantissa = (u & 0x0F) as i32;
    let s = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if sign != 0 {
        -s as i16
    } else {
        s as i16
    }
}

/// Largest reconstruction error for samples that encode to `code`
/// (samples within the clip level).
pub fn ulaw_max_error(code: u8) -> i32 {
    let exponent = ((!code >> 4) & 0x07) as i32;
    1 << (exponent + 2)
}

/// Phase quantization step in radians
pub const PHASE_STEP: f32 = PI / 32767.0;

/// Wrap a phase into [-pi, pi].
pub fn wrap_phase(phase: f32) -> f32 {
    if (-PI..=PI).contains(&phase) {
        return phase;
    }
    let two_pi = 2.0 * PI;
    let wrapped = (phase + PI).rem_euclid(two_pi) - PI;
    wrapped.clamp(-PI, PI)
}

pub fn quantize_phase(phase: f32) -> i16 {
    let q = (wrap_phase(phase) / PI * 32767.0).round();
    q.clamp(-32767.0, 32767.0) as i16
}

pub fn unquantize_phase(q: i16) -> f32 {
    (q.max(-32767) as f32) / 32767.0 * PI
}
