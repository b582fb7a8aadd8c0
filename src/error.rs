//! Error types for the murmur client

use thiserror::Error;

/// Result type alias for murmur operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the murmur client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Required capability (microphone, camera) not available
    #[error("capability unavailable: {0}")]
    CapabilityDenied(String),

    /// Capture device acquisition or read failure
    #[error("capture device error: {0}")]
    CaptureDevice(String),

    /// Audio container encoding error
    #[error("encode error: {0}")]
    Encode(String),

    /// No evidence image could be captured when the service required one
    #[error("evidence unavailable: {0}")]
    EvidenceUnavailable(String),

    /// No response received from the remote service
    #[error("transport failure: {0}")]
    Transport(String),

    /// Response received but unusable
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// Reply playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
