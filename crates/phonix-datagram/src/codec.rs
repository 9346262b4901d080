//! Payload codecs
//!
//! A timeline declares its payload kind once, in the processing header
//! (`payload=raw|mcep|lpc|hnm|float`). The reader builds one `Codec` from
//! those properties and every datagram of the timeline decodes through it.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes};

use phonix_core::{PhonixError, PhonixResult, Properties, StructuredBuf};

use crate::{Datagram, HnmCodec, HnmFrame, LpcCodec, LpcFrame};

/// Property key selecting the payload kind
pub const PAYLOAD_KEY: &str = "payload";

/// Payload kind identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Raw,
    MelCepstrum,
    Lpc,
    HarmonicNoise,
    FloatArray,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Raw => "raw",
            PayloadKind::MelCepstrum => "mcep",
            PayloadKind::Lpc => "lpc",
            PayloadKind::HarmonicNoise => "hnm",
            PayloadKind::FloatArray => "float",
        }
    }
}

impl FromStr for PayloadKind {
    type Err = PhonixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(PayloadKind::Raw),
            "mcep" => Ok(PayloadKind::MelCepstrum),
            "lpc" => Ok(PayloadKind::Lpc),
            "hnm" => Ok(PayloadKind::HarmonicNoise),
            "float" => Ok(PayloadKind::FloatArray),
            other => Err(PhonixError::MalformedFile(format!(
                "unknown payload kind {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Raw(Bytes),
    MelCepstrum(Vec<f32>),
    Lpc(LpcFrame),
    HarmonicNoise(HnmFrame),
    FloatArray(Vec<f32>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Raw(_) => PayloadKind::Raw,
            Payload::MelCepstrum(_) => PayloadKind::MelCepstrum,
            Payload::Lpc(_) => PayloadKind::Lpc,
            Payload::HarmonicNoise(_) => PayloadKind::HarmonicNoise,
            Payload::FloatArray(_) => PayloadKind::FloatArray,
        }
    }
}

/// Codec selected once per timeline
#[derive(Clone, Debug, PartialEq)]
pub enum Codec {
    Raw,
    MelCepstrum { order: usize },
    Lpc(LpcCodec),
    HarmonicNoise(HnmCodec),
    FloatArray,
}

impl Codec {
    /// Build the codec declared by a processing header. A missing
    /// `payload` key means raw bytes.
    pub fn from_properties(props: &Properties) -> PhonixResult<Self> {
        let kind = match props.get(PAYLOAD_KEY) {
            None => PayloadKind::Raw,
            Some(raw) => raw.parse()?,
        };
        Ok(match kind {
            PayloadKind::Raw => Codec::Raw,
            PayloadKind::MelCepstrum => {
                let order: usize = props.parse_value("mcep.order")?;
                if order == 0 {
                    return Err(PhonixError::MalformedFile("mcep.order must be positive".into()));
                }
                Codec::MelCepstrum { order }
            }
            PayloadKind::Lpc => Codec::Lpc(LpcCodec::from_properties(props)?),
            PayloadKind::HarmonicNoise => Codec::HarmonicNoise(HnmCodec::from_properties(props)?),
            PayloadKind::FloatArray => Codec::FloatArray,
        })
    }

    /// Properties declaring this codec in a processing header.
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new().with(PAYLOAD_KEY, self.kind());
        match self {
            Codec::MelCepstrum { order } => props.set("mcep.order", order),
            Codec::Lpc(lpc) => lpc.write_properties(&mut props),
            Codec::HarmonicNoise(hnm) => hnm.write_properties(&mut props),
            Codec::Raw | Codec::FloatArray => {}
        }
        props
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Codec::Raw => PayloadKind::Raw,
            Codec::MelCepstrum { .. } => PayloadKind::MelCepstrum,
            Codec::Lpc(_) => PayloadKind::Lpc,
            Codec::HarmonicNoise(_) => PayloadKind::HarmonicNoise,
            Codec::FloatArray => PayloadKind::FloatArray,
        }
    }

    /// Decode a datagram's payload.
    pub fn decode(&self, datagram: &Datagram) -> PhonixResult<Payload> {
        let data = &datagram.data[..];
        match self {
            Codec::Raw => Ok(Payload::Raw(datagram.data.clone())),
            Codec::MelCepstrum { order } => {
                if data.len() != order * 4 {
                    return Err(PhonixError::MalformedFile(format!(
                        "mel-cepstrum payload of {} bytes, expected {} coefficients",
                        data.len(),
                        order
                    )));
                }
                let mut buf = data;
                Ok(Payload::MelCepstrum(buf.read_f32_vec(*order, "mel-cepstrum")?))
            }
            Codec::Lpc(lpc) => Ok(Payload::Lpc(lpc.decode(data)?)),
            Codec::HarmonicNoise(hnm) => Ok(Payload::HarmonicNoise(hnm.decode(data)?)),
            Codec::FloatArray => {
                let mut buf = data;
                let n = buf.read_count("float array length")?;
                if buf.len() != n * 4 {
                    return Err(PhonixError::MalformedFile(format!(
                        "float array declares {} values but carries {} bytes",
                        n,
                        buf.len()
                    )));
                }
                Ok(Payload::FloatArray(buf.read_f32_vec(n, "float array")?))
            }
        }
    }

    /// Encode a payload into a datagram of the given duration.
    pub fn encode(&self, duration: i64, payload: &Payload) -> PhonixResult<Datagram> {
        let data: Bytes = match (self, payload) {
            (Codec::Raw, Payload::Raw(bytes)) => bytes.clone(),
            (Codec::MelCepstrum { order }, Payload::MelCepstrum(coeffs)) => {
                if coeffs.len() != *order {
                    return Err(PhonixError::InvalidArgument(format!(
                        "expected {} mel-cepstrum coefficients, got {}",
                        order,
                        coeffs.len()
                    )));
                }
                let mut buf = Vec::with_capacity(order * 4);
                for &c in coeffs {
                    buf.put_f32(c);
                }
                buf.into()
            }
            (Codec::Lpc(lpc), Payload::Lpc(frame)) => lpc.encode(frame)?.into(),
            (Codec::HarmonicNoise(hnm), Payload::HarmonicNoise(frame)) => hnm.encode(frame)?.into(),
            (Codec::FloatArray, Payload::FloatArray(values)) => {
                let len = i32::try_from(values.len()).map_err(|_| {
                    PhonixError::InvalidArgument(format!("float array of {} values is too long", values.len()))
                })?;
                let mut buf = Vec::with_capacity(4 + values.len() * 4);
                buf.put_i32(len);
                for &v in values {
                    buf.put_f32(v);
                }
                buf.into()
            }
            (codec, payload) => {
                return Err(PhonixError::InvalidArgument(format!(
                    "cannot encode a {} payload with the {} codec",
                    payload.kind(),
                    codec.kind()
                )))
            }
        };
        Ok(Datagram::new(duration, data))
    }
}
