//! Phonix Datagram - Duration-stamped payload records
//!
//! This crate implements the datagram record stored in timelines and the
//! payload codecs a timeline can declare:
//! - Raw bytes (audio, basenames)
//! - Mel-cepstrum frames
//! - Quantized LPC coefficients + mu-law residual
//! - Harmonic-plus-noise frames
//! - Float arrays

pub mod codec;
pub mod datagram;
pub mod hnm;
pub mod lpc;
pub mod quantize;

pub use codec::*;
pub use datagram::*;
pub use hnm::*;
pub use lpc::*;
pub use quantize::*;
