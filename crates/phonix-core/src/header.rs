//! File header shared by all Phonix data files
//!
//! Header is 12 bytes, big-endian:
//! - Bytes 0-3: Magic "MARY" (0x4D415259)
//! - Bytes 4-7: Format version
//! - Bytes 8-11: File type

use bytes::{Buf, BufMut};

use crate::{PhonixError, PhonixResult, StructuredBuf};

/// File header size in bytes
pub const FILE_HEADER_SIZE: usize = 12;

/// Magic number at the start of every file
pub const FILE_MAGIC: u32 = 0x4D41_5259;

/// Current file format version
pub const FILE_VERSION: i32 = 40;

/// File type identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FileType {
    /// Unit file (start time + duration per unit)
    Units = 200,
    /// Feature file with one vector per phone unit
    UnitFeatures = 300,
    /// Feature file with one vector per half-phone unit
    HalfPhoneUnitFeatures = 301,
    /// Timeline file
    Timeline = 500,
}

impl FileType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            200 => Some(FileType::Units),
            300 => Some(FileType::UnitFeatures),
            301 => Some(FileType::HalfPhoneUnitFeatures),
            500 => Some(FileType::Timeline),
            _ => None,
        }
    }

    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Standard file header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub version: i32,
    pub file_type: FileType,
}

impl FileHeader {
    pub fn new(file_type: FileType) -> Self {
        FileHeader {
            version: FILE_VERSION,
            file_type,
        }
    }

    /// Parse a header from the front of `buf`, advancing it.
    pub fn parse(buf: &mut impl Buf) -> PhonixResult<Self> {
        let magic = buf.read_u32("file magic")?;
        if magic != FILE_MAGIC {
            return Err(PhonixError::MalformedFile(format!(
                "bad magic number {:#010x}",
                magic
            )));
        }
        let version = buf.read_i32("file version")?;
        if version != FILE_VERSION {
            return Err(PhonixError::MalformedFile(format!(
                "unsupported file version {} (expected {})",
                version, FILE_VERSION
            )));
        }
        let code = buf.read_i32("file type")?;
        let file_type = FileType::from_code(code)
            .ok_or_else(|| PhonixError::MalformedFile(format!("unknown file type {}", code)))?;

        Ok(FileHeader { version, file_type })
    }

    /// Parse a header and check that it has one of the expected types.
    pub fn expect(buf: &mut impl Buf, allowed: &[FileType]) -> PhonixResult<Self> {
        let header = Self::parse(buf)?;
        if !allowed.contains(&header.file_type) {
            return Err(PhonixError::MalformedFile(format!(
                "expected file type {:?}, found {:?}",
                allowed, header.file_type
            )));
        }
        Ok(header)
    }

    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32(FILE_MAGIC);
        buf.put_i32(self.version);
        buf.put_i32(self.file_type.code());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FILE_HEADER_SIZE);
        self.write(&mut buf);
        buf
    }
}
