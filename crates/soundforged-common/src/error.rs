//! Common error types used throughout soundforged.

/// Common error type for soundforged value parsing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested output format is not one of the supported profiles.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The requested bitrate could not be parsed or is out of range.
    #[error("invalid bitrate: {0}")]
    InvalidBitrate(String),

    /// An identifier failed sanitization.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl Error {
    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(value: S) -> Self {
        Self::UnsupportedFormat(value.into())
    }

    /// Create a new InvalidBitrate error.
    pub fn invalid_bitrate<S: Into<String>>(value: S) -> Self {
        Self::InvalidBitrate(value.into())
    }

    /// Create a new InvalidIdentifier error.
    pub fn invalid_identifier<S: Into<String>>(value: S) -> Self {
        Self::InvalidIdentifier(value.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unsupported_format("ogg");
        assert_eq!(err.to_string(), "unsupported format: ogg");

        let err = Error::invalid_bitrate("abc");
        assert_eq!(err.to_string(), "invalid bitrate: abc");

        let err = Error::invalid_identifier("../etc/passwd");
        assert_eq!(err.to_string(), "invalid identifier: ../etc/passwd");
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            Error::unsupported_format("flac"),
            Error::UnsupportedFormat(_)
        ));
        assert!(matches!(Error::invalid_bitrate("0"), Error::InvalidBitrate(_)));
        assert!(matches!(
            Error::invalid_identifier(""),
            Error::InvalidIdentifier(_)
        ));
    }
}
