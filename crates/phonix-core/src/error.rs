//! Error types for Phonix storage and retrieval

use thiserror::Error;

/// Core Phonix errors
#[derive(Error, Debug)]
pub enum PhonixError {
    // Format errors
    #[error("Malformed file: {0}")]
    MalformedFile(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    // Range errors
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },

    #[error("Negative time position: {0}")]
    NegativeTime(i64),

    // I/O errors
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated data at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    // Caller errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PhonixError {
    /// Shorthand for a malformed-file error
    pub fn malformed(msg: impl Into<String>) -> Self {
        PhonixError::MalformedFile(msg.into())
    }

    /// True for errors caused by the underlying medium rather than the
    /// caller or the file structure.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, PhonixError::Io(_) | PhonixError::Truncated { .. })
    }
}

/// Result type for Phonix operations
pub type PhonixResult<T> = Result<T, PhonixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_classification() {
        let io = PhonixError::from(std::io::Error::new(std::io::ErrorKind::Other, "gone"));
        assert!(io.is_io_failure());

        let truncated = PhonixError::Truncated {
            offset: 10,
            needed: 100,
            available: 4,
        };
        assert!(truncated.is_io_failure());

        assert!(!PhonixError::malformed("bad magic").is_io_failure());
        assert!(!PhonixError::NegativeTime(-1).is_io_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = PhonixError::OutOfRange {
            what: "unit",
            index: 7,
            len: 3,
        };
        assert_eq!(err.to_string(), "unit index 7 out of range (len 3)");
    }
}
