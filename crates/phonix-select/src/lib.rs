//! Phonix Select - Unit databases and candidate preselection
//!
//! This crate provides:
//! - Targets with markup context and diphone targets
//! - Candidates with lazily resolved, cached target costs
//! - Preselection through an injected CART
//! - Unit database with basename blacklisting
//! - Diphone unit database built on half-phone units
//! - Syllable iteration over feature vectors
//! - Voice configuration and loading

pub mod blacklist;
pub mod candidate;
pub mod cart;
pub mod database;
pub mod diphone;
pub mod syllable;
pub mod target;
pub mod voice;

#[cfg(test)]
pub(crate) mod fixture;

pub use blacklist::*;
pub use candidate::*;
pub use cart::*;
pub use database::*;
pub use diphone::*;
pub use syllable::*;
pub use target::*;
pub use voice::*;
