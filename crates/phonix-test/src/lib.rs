//! Phonix Test Harness - Synthetic voices and end-to-end checks
//!
//! This crate provides:
//! - Deterministic synthetic voices written to a temporary directory
//! - End-to-end checks across loading, timeline access and selection

pub mod integration;
pub mod synth;

pub use integration::*;
pub use synth::*;
