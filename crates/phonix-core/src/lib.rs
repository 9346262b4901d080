//! Phonix Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Phonix storage crate:
//! - Error type (PhonixError, PhonixResult)
//! - File header with magic, version and file type
//! - Processing-header properties (key=value text)
//! - Checked big-endian buffer access
//! - Units and the unit file

pub mod buf;
pub mod error;
pub mod header;
pub mod props;
pub mod unit;

pub use buf::*;
pub use error::*;
pub use header::*;
pub use props::*;
pub use unit::*;
