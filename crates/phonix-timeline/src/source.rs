//! Random-access byte sources over a timeline's datagram zone
//!
//! Callers ask for windows of bytes at zone offsets; they never see a file
//! position. A memory-mapped source hands out reference-counted slices of
//! one shared mapping. A piecewise source reads bounded windows from a shared
//! file handle with positional reads, so concurrent readers never race on a
//! seek cursor.

use std::fmt;
use std::fs::File;
use std::io;

use bytes::Bytes;
use memmap2::MmapOptions;

use phonix_core::{PhonixError, PhonixResult};

/// How a source reaches its bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStrategy {
    /// Datagram zone mapped once into memory
    MemoryMapped,
    /// Positional reads from a shared file handle
    Piecewise,
    /// Zone held in an in-memory buffer
    InMemory,
}

/// Random access to the datagram zone
pub trait ByteSource: Send + Sync + fmt::Debug {
    /// Length of the datagram zone in bytes
    fn len(&self) -> u64;

    /// Bytes starting at zone offset `offset`. The window holds at least
    /// `min_len` bytes unless the zone ends sooner; it may hold more.
    fn window(&self, offset: u64, min_len: usize) -> PhonixResult<Bytes>;

    fn strategy(&self) -> IoStrategy;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source backed by one shared buffer: a memory mapping or plain bytes
pub struct SharedSource {
    data: Bytes,
    strategy: IoStrategy,
}

impl SharedSource {
    /// Map `len` bytes of `file` starting at `offset`.
    pub fn map(file: &File, offset: u64, len: u64) -> io::Result<Self> {
        if len == 0 {
            return Ok(SharedSource {
                data: Bytes::new(),
                strategy: IoStrategy::MemoryMapped,
            });
        }
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "zone too large to map"))?;
        // SAFETY: the mapping is read-only and timeline files are never
        // modified while a voice is loaded.
        let mmap = unsafe { MmapOptions::new().offset(offset).len(len).map(file)? };
        Ok(SharedSource {
            data: Bytes::from_owner(mmap),
            strategy: IoStrategy::MemoryMapped,
        })
    }

    pub fn from_bytes(data: Bytes) -> Self {
        SharedSource {
            data,
            strategy: IoStrategy::InMemory,
        }
    }
}

impl fmt::Debug for SharedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSource")
            .field("len", &self.data.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl ByteSource for SharedSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn window(&self, offset: u64, _min_len: usize) -> PhonixResult<Bytes> {
        let start = (offset.min(self.data.len() as u64)) as usize;
        Ok(self.data.slice(start..))
    }

    fn strategy(&self) -> IoStrategy {
        self.strategy
    }
}

/// Source reading bounded windows from a shared file handle
#[derive(Debug)]
pub struct PiecewiseSource {
    file: File,
    zone_start: u64,
    zone_len: u64,
    buffer_size: usize,
}

impl PiecewiseSource {
    pub fn new(file: File, zone_start: u64, zone_len: u64, buffer_size: usize) -> Self {
        PiecewiseSource {
            file,
            zone_start,
            zone_len,
            buffer_size: buffer_size.max(1),
        }
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl ByteSource for PiecewiseSource {
    fn len(&self) -> u64 {
        self.zone_len
    }

    fn window(&self, offset: u64, min_len: usize) -> PhonixResult<Bytes> {
        if offset >= self.zone_len {
            return Ok(Bytes::new());
        }
        let wanted = self.buffer_size.max(min_len) as u64;
        let len = wanted.min(self.zone_len - offset) as usize;
        let mut buf = vec![0u8; len];
        read_exact_at(&self.file, &mut buf, self.zone_start + offset)?;
        Ok(Bytes::from(buf))
    }

    fn strategy(&self) -> IoStrategy {
        IoStrategy::Piecewise
    }
}

/// Read exactly `buf.len()` bytes at an absolute file offset without
/// touching a shared cursor.
#[cfg(unix)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> PhonixResult<()> {
    use std::os::unix::fs::FileExt;
    let needed = buf.len() as u64;
    file.read_exact_at(buf, offset).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PhonixError::Truncated {
            offset,
            needed,
            available: 0,
        },
        _ => PhonixError::Io(e),
    })
}

/// Read exactly `buf.len()` bytes at an absolute file offset without
/// touching a shared cursor.
#[cfg(windows)]
pub fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> PhonixResult<()> {
    use std::os::windows::fs::FileExt;
    let needed = buf.len() as u64;
    let start = offset;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(PhonixError::Truncated {
                    offset: start,
                    needed,
                    available: offset - start,
                })
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(PhonixError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zone_file(content: &[u8]) -> (tempfile::NamedTempFile, File) {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        tmp.flush().unwrap();
        let file = File::open(tmp.path()).unwrap();
        (tmp, file)
    }

    #[test]
    fn test_shared_source_windows() {
        let source = SharedSource::from_bytes(Bytes::from_static(b"0123456789"));
        assert_eq!(source.len(), 10);
        assert_eq!(&source.window(3, 2).unwrap()[..], b"3456789");
        assert!(source.window(10, 1).unwrap().is_empty());
        assert!(source.window(50, 1).unwrap().is_empty());
        assert_eq!(source.strategy(), IoStrategy::InMemory);
    }

    #[test]
    fn test_piecewise_window_bounds() {
        let content: Vec<u8> = (0u8..100).collect();
        let (_tmp, file) = zone_file(&content);
        // Zone = bytes 10..90
        let source = PiecewiseSource::new(file, 10, 80, 16);

        let w = source.window(0, 4).unwrap();
        assert_eq!(w.len(), 16);
        assert_eq!(w[0], 10);

        // Grown to fit a larger request
        let w = source.window(0, 40).unwrap();
        assert_eq!(w.len(), 40);

        // Clamped at zone end
        let w = source.window(70, 4).unwrap();
        assert_eq!(w.len(), 10);
        assert_eq!(w[9], 89);

        assert!(source.window(80, 1).unwrap().is_empty());
    }

    #[test]
    fn test_mapped_matches_piecewise() {
        let content: Vec<u8> = (0u8..=255).cycle().take(5000).collect();
        let (_tmp, file) = zone_file(&content);
        let mapped = SharedSource::map(&file, 100, 4000).unwrap();
        let piecewise = PiecewiseSource::new(file.try_clone().unwrap(), 100, 4000, 64);

        assert_eq!(mapped.strategy(), IoStrategy::MemoryMapped);
        for offset in [0u64, 1, 63, 64, 1999, 3990] {
            let a = mapped.window(offset, 8).unwrap();
            let b = piecewise.window(offset, 8).unwrap();
            let n = a.len().min(b.len());
            assert_eq!(&a[..n], &b[..n]);
        }
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let (_tmp, file) = zone_file(b"short");
        let mut buf = [0u8; 10];
        let err = read_exact_at(&file, &mut buf, 0).unwrap_err();
        assert!(err.is_io_failure());
    }
}
