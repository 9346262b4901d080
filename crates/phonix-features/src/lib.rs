//! Phonix Features - Per-unit feature vectors
//!
//! This crate provides:
//! - FeatureDefinition: the schema of byte, short and continuous features
//! - FeatureVector: one fixed-layout record per unit
//! - FeatureFile: the loaded store, with projection onto a sub-schema
//! - FeatureFileWriter: serialisation for tools and fixtures

pub mod definition;
pub mod file;
pub mod vector;

pub use definition::*;
pub use file::*;
pub use vector::*;
