//! Phonix Timeline - Append-only, time-indexed datagram storage
//!
//! File layout:
//! - File header (type TIMELINE)
//! - Processing header (key=value properties declaring the payload codec)
//! - Dimensions: sample rate, datagram count, zone positions
//! - Datagram zone
//! - Time index zone
//!
//! Readers access the datagram zone through a `ByteSource`: a shared
//! memory mapping when possible, positional reads from a shared file handle
//! otherwise. Both give identical results.

pub mod config;
mod cursor;
pub mod index;
pub mod reader;
pub mod source;
pub mod writer;

pub use config::*;
pub use index::*;
pub use reader::*;
pub use source::*;
pub use writer::*;
