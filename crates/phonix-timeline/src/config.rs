//! Timeline reader configuration

/// Default piecewise read window (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 0x10000;

/// Timeline reader configuration
#[derive(Clone, Debug)]
pub struct TimelineConfig {
    /// Try to memory-map the datagram zone; fall back to piecewise reads
    /// when mapping fails
    pub try_memory_map: bool,
    /// Piecewise read window. Grown per read when one datagram does not fit.
    pub buffer_size: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            try_memory_map: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TimelineConfig {
    /// Configuration that never maps the file
    pub fn piecewise() -> Self {
        TimelineConfig {
            try_memory_map: false,
            ..Default::default()
        }
    }

    /// Piecewise reads with a custom window size
    pub fn piecewise_with_buffer(buffer_size: usize) -> Self {
        TimelineConfig {
            try_memory_map: false,
            buffer_size: buffer_size.max(1),
        }
    }
}
