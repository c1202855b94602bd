//! Error types for decompression operations.

use thiserror::Error;

/// Result type alias for decompression operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Decompression error types.
///
/// Data-dependent failures (`Corrupted`, `UnexpectedEof`, `MissingCarryOver`)
/// and programming errors (`Internal`) are separate variants on purpose:
/// a decoder bug must never be reported as bad input, and no input,
/// however adversarial, may ever produce an `Internal` error.
#[derive(Debug, Error)]
pub enum Error {
    /// Input data is corrupted or violates the format.
    #[error("corrupted data: {message}")]
    Corrupted { message: String },

    /// Unexpected end of input stream.
    #[error("unexpected EOF after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: usize },

    /// A section requested "repeat previous table" but no previous table exists.
    #[error("missing carry-over state: {what}")]
    MissingCarryOver { what: &'static str },

    /// Internal invariant violation. Indicates a bug in the decoder,
    /// never a property of the input.
    #[error("internal error: {message}")]
    Internal { message: String },

    /// Buffer too small for output.
    #[error("buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported feature or format.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::Corrupted {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(bytes_read: usize) -> Self {
        Error::UnexpectedEof { bytes_read }
    }

    /// Create a missing carry-over error.
    pub fn missing_carry_over(what: &'static str) -> Self {
        Error::MissingCarryOver { what }
    }

    /// Create an internal invariant error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(required: usize, provided: usize) -> Self {
        Error::BufferTooSmall { required, provided }
    }

    /// Check whether the error describes bad input (as opposed to an I/O
    /// failure or a decoder bug).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::Corrupted { .. }
                | Error::UnexpectedEof { .. }
                | Error::MissingCarryOver { .. }
        )
    }

    /// Get error category for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Corrupted { .. } => "corrupted_data",
            Error::UnexpectedEof { .. } => "unexpected_eof",
            Error::MissingCarryOver { .. } => "missing_carry_over",
            Error::Internal { .. } => "internal",
            Error::BufferTooSmall { .. } => "buffer_too_small",
            Error::Io(_) => "io_error",
            Error::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(Error::corrupted("x").category(), "corrupted_data");
        assert_eq!(Error::unexpected_eof(3).category(), "unexpected_eof");
        assert_eq!(
            Error::missing_carry_over("fse table").category(),
            "missing_carry_over"
        );
        assert_eq!(Error::internal("bug").category(), "internal");
    }

    #[test]
    fn test_data_error_classification() {
        assert!(Error::corrupted("x").is_data_error());
        assert!(Error::unexpected_eof(0).is_data_error());
        assert!(!Error::internal("bug").is_data_error());
        assert!(!Error::Io(std::io::Error::other("io")).is_data_error());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::unexpected_eof(17);
        assert!(err.to_string().contains("17"));
    }
}
