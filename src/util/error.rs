//! Error types for nerfpack.

use thiserror::Error;

/// Main error type for decoding and rendering operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A container field is missing, mistyped or has the wrong size
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// The asset uses a layout this renderer does not implement
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// A dispatch asked for more elements than the tile can address
    #[error("Dispatch of {requested} elements exceeds tile capacity of {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    /// Kernel link or surface allocation failed
    #[error("Device resource failure: {0}")]
    DeviceResourceFailure(String),

    /// The container bytes are not valid CBOR
    #[error("Container decode failed: {0}")]
    Decode(String),

    /// Configuration could not be parsed or written
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a malformed-container error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedContainer(msg.into())
    }

    /// Create an unsupported-layout error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }

    /// Create a device resource error.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceResourceFailure(msg.into())
    }
}

/// Result type alias for nerfpack operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::CapacityExceeded { requested: 10, capacity: 4 };
        assert!(e.to_string().contains("10"));
        assert!(e.to_string().contains("4"));

        let e = Error::unsupported("2 density layers");
        assert!(e.to_string().contains("density"));
        assert!(matches!(e, Error::UnsupportedLayout(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
