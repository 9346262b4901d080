//! Harmonic-plus-noise codec
//!
//! Frame layout (big-endian):
//! - f32 f0 (Hz, 0 when unvoiced)
//! - f32 maximum voiced frequency (Hz)
//! - f32 analysis time (s)
//! - i32 number of harmonics `n`
//! - `n` x f32 harmonic amplitudes
//! - `n` x i16 harmonic phases, quantized over [-pi, pi]
//! - noise block, selected by the timeline's `hnm.noiseModel` tag
//!
//! Noise blocks:
//! - 1 Waveform: i32 n, n x i16 samples
//! - 2 Lpc: i32 order, order x f32 coefficients, f32 gain
//! - 3 PseudoHarmonic: i32 n, n x f32 amplitudes
//! - 4 HighpassWaveform: f32 cutoff (Hz), i32 n, n x i16 samples

use bytes::BufMut;

use phonix_core::{PhonixError, PhonixResult, Properties, StructuredBuf};

use crate::{quantize_phase, unquantize_phase};

/// Noise model identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NoiseModel {
    Waveform = 1,
    Lpc = 2,
    PseudoHarmonic = 3,
    HighpassWaveform = 4,
}

impl NoiseModel {
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(NoiseModel::Waveform),
            2 => Some(NoiseModel::Lpc),
            3 => Some(NoiseModel::PseudoHarmonic),
            4 => Some(NoiseModel::HighpassWaveform),
            _ => None,
        }
    }

    #[inline]
    pub fn tag(self) -> i32 {
        self as i32
    }
}

/// Noise part of a frame
#[derive(Clone, Debug, PartialEq)]
pub enum NoisePart {
    Waveform(Vec<i16>),
    Lpc { coeffs: Vec<f32>, gain: f32 },
    PseudoHarmonic(Vec<f32>),
    HighpassWaveform { cutoff_hz: f32, samples: Vec<i16> },
}

impl NoisePart {
    pub fn model(&self) -> NoiseModel {
        match self {
            NoisePart::Waveform(_) => NoiseModel::Waveform,
            NoisePart::Lpc { .. } => NoiseModel::Lpc,
            NoisePart::PseudoHarmonic(_) => NoiseModel::PseudoHarmonic,
            NoisePart::HighpassWaveform { .. } => NoiseModel::HighpassWaveform,
        }
    }
}

/// Harmonic component: amplitude and phase per harmonic
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HarmonicPart {
    pub amplitudes: Vec<f32>,
    pub phases: Vec<f32>,
}

/// One decoded harmonic-plus-noise frame
#[derive(Clone, Debug, PartialEq)]
pub struct HnmFrame {
    pub f0: f32,
    pub max_voiced_freq: f32,
    pub t_analysis: f32,
    pub harmonics: HarmonicPart,
    pub noise: NoisePart,
}

/// HNM codec: the noise model is fixed per timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HnmCodec {
    pub noise_model: NoiseModel,
}

impl HnmCodec {
    pub fn new(noise_model: NoiseModel) -> Self {
        HnmCodec { noise_model }
    }

    pub fn from_properties(props: &Properties) -> PhonixResult<Self> {
        let tag: i32 = props.parse_value("hnm.noiseModel")?;
        let noise_model = NoiseModel::from_tag(tag)
            .ok_or_else(|| PhonixError::MalformedFile(format!("unknown HNM noise model {}", tag)))?;
        Ok(HnmCodec { noise_model })
    }

    pub fn write_properties(&self, props: &mut Properties) {
        props.set("hnm.noiseModel", self.noise_model.tag());
    }

    pub fn decode(&self, data: &[u8]) -> PhonixResult<HnmFrame> {
        let mut buf = data;
        let f0 = buf.read_f32("HNM f0")?;
        let max_voiced_freq = buf.read_f32("HNM max voiced frequency")?;
        let t_analysis = buf.read_f32("HNM analysis time")?;
        let n = buf.read_count("number of harmonics")?;
        let amplitudes = buf.read_f32_vec(n, "harmonic amplitudes")?;
        let phases = buf
            .read_i16_vec(n, "harmonic phases")?
            .into_iter()
            .map(unquantize_phase)
            .collect();

        let noise = match self.noise_model {
            NoiseModel::Waveform => {
                let n = buf.read_count("noise waveform length")?;
                NoisePart::Waveform(buf.read_i16_vec(n, "noise waveform")?)
            }
            NoiseModel::Lpc => {
                let order = buf.read_count("noise LPC order")?;
                let coeffs = buf.read_f32_vec(order, "noise LPC coefficients")?;
                let gain = buf.read_f32("noise LPC gain")?;
                NoisePart::Lpc { coeffs, gain }
            }
            NoiseModel::PseudoHarmonic => {
                let n = buf.read_count("noise harmonics")?;
                NoisePart::PseudoHarmonic(buf.read_f32_vec(n, "noise amplitudes")?)
            }
            NoiseModel::HighpassWaveform => {
                let cutoff_hz = buf.read_f32("noise cutoff")?;
                let n = buf.read_count("noise waveform length")?;
                let samples = buf.read_i16_vec(n, "noise waveform")?;
                NoisePart::HighpassWaveform { cutoff_hz, samples }
            }
        };

        if !buf.is_empty() {
            return Err(PhonixError::MalformedFile(format!(
                "{} trailing bytes after HNM frame",
                buf.len()
            )));
        }

        Ok(HnmFrame {
            f0,
            max_voiced_freq,
            t_analysis,
            harmonics: HarmonicPart { amplitudes, phases },
            noise,
        })
    }

    pub fn encode(&self, frame: &HnmFrame) -> PhonixResult<Vec<u8>> {
        if frame.noise.model() != self.noise_model {
            return Err(PhonixError::InvalidArgument(format!(
                "frame uses noise model {:?}, timeline declares {:?}",
                frame.noise.model(),
                self.noise_model
            )));
        }
        let h = &frame.harmonics;
        if h.amplitudes.len() != h.phases.len() {
            return Err(PhonixError::InvalidArgument(format!(
                "{} harmonic amplitudes but {} phases",
                h.amplitudes.len(),
                h.phases.len()
            )));
        }

        let mut buf = Vec::with_capacity(16 + h.amplitudes.len() * 6);
        buf.put_f32(frame.f0);
        buf.put_f32(frame.max_voiced_freq);
        buf.put_f32(frame.t_analysis);
        put_len(&mut buf, h.amplitudes.len())?;
        for &a in &h.amplitudes {
            buf.put_f32(a);
        }
        for &p in &h.phases {
            buf.put_i16(quantize_phase(p));
        }

        match &frame.noise {
            NoisePart::Waveform(samples) => put_samples(&mut buf, samples)?,
            NoisePart::Lpc { coeffs, gain } => {
                put_len(&mut buf, coeffs.len())?;
                for &c in coeffs {
                    buf.put_f32(c);
                }
                buf.put_f32(*gain);
            }
            NoisePart::PseudoHarmonic(amplitudes) => {
                put_len(&mut buf, amplitudes.len())?;
                for &a in amplitudes {
                    buf.put_f32(a);
                }
            }
            NoisePart::HighpassWaveform { cutoff_hz, samples } => {
                buf.put_f32(*cutoff_hz);
                put_samples(&mut buf, samples)?;
            }
        }
        Ok(buf)
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> PhonixResult<()> {
    let len = i32::try_from(len)
        .map_err(|_| PhonixError::InvalidArgument(format!("array of {} elements is too long", len)))?;
    buf.put_i32(len);
    Ok(())
}

fn put_samples(buf: &mut Vec<u8>, samples: &[i16]) -> PhonixResult<()> {
    put_len(buf, samples.len())?;
    for &s in samples {
        buf.put_i16(s);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PHASE_STEP;

    fn frame(noise: NoisePart) -> HnmFrame {
        HnmFrame {
            f0: 120.5,
            max_voiced_freq: 4000.0,
            t_analysis: 0.015,
            harmonics: HarmonicPart {
                amplitudes: vec![0.9, 0.4, 0.05],
                phases: vec![0.0, 1.2, -3.1],
            },
            noise,
        }
    }

    fn assert_close(original: &HnmFrame, decoded: &HnmFrame) {
        assert_eq!(decoded.f0, original.f0);
        assert_eq!(decoded.max_voiced_freq, original.max_voiced_freq);
        assert_eq!(decoded.t_analysis, original.t_analysis);
        assert_eq!(decoded.harmonics.amplitudes, original.harmonics.amplitudes);
        for (a, b) in original.harmonics.phases.iter().zip(&decoded.harmonics.phases) {
            assert!((a - b).abs() <= PHASE_STEP);
        }
        assert_eq!(decoded.noise, original.noise);
    }

    #[test]
    fn test_every_noise_model_roundtrip() {
        let parts = vec![
            NoisePart::Waveform(vec![1, -2, 300]),
            NoisePart::Lpc {
                coeffs: vec![0.5, -0.25],
                gain: 0.01,
            },
            NoisePart::PseudoHarmonic(vec![0.1, 0.2]),
            NoisePart::HighpassWaveform {
                cutoff_hz: 3500.0,
                samples: vec![7, 8],
            },
        ];
        for part in parts {
            let codec = HnmCodec::new(part.model());
            let original = frame(part);
            let bytes = codec.encode(&original).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert_close(&original, &decoded);
        }
    }

    #[test]
    fn test_noise_model_mismatch() {
        let codec = HnmCodec::new(NoiseModel::Lpc);
        assert!(codec.encode(&frame(NoisePart::Waveform(vec![]))).is_err());
    }

    #[test]
    fn test_decode_with_wrong_model_fails() {
        let bytes = HnmCodec::new(NoiseModel::PseudoHarmonic)
            .encode(&frame(NoisePart::PseudoHarmonic(vec![0.1, 0.2, 0.3])))
            .unwrap();
        // Lpc reads an order, three coefficients and a gain: 4 bytes short
        assert!(HnmCodec::new(NoiseModel::Lpc).decode(&bytes).is_err());
    }

    #[test]
    fn test_unknown_noise_model_tag() {
        let props = Properties::new().with("hnm.noiseModel", 9);
        assert!(HnmCodec::from_properties(&props).is_err());
    }
}
