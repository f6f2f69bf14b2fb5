//! Error types for the drone autopilot library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A frame read returned fewer bytes than a full frame
    #[error("Short frame read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes in a complete frame
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// The video source has no more frames
    #[error("Video stream closed")]
    StreamClosed,

    /// Flight driver rejected or failed a command
    #[error("Driver error: {0}")]
    Driver(String),

    /// Face detector failed to load or run
    #[error("Detector error: {0}")]
    Detector(String),

    /// Snapshot could not be written
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unknown or malformed control command
    #[error("Unknown command: {0}")]
    CommandParse(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the video loop should keep running after this error
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::StreamClosed)
    }
}
