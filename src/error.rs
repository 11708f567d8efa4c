//! Crate-level error type.

use thiserror::Error;

/// Errors surfaced by the assistant client.
///
/// User-facing request failures (rate limiting, rejected requests, offline
/// state) are not errors at this level: they are reported as
/// [`crate::FailureReason`] and rendered into the conversation. `ChatError`
/// covers misconfiguration, transport plumbing and lifecycle misuse.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body stream failed after the request was accepted.
    #[error("stream error: {0}")]
    Stream(String),

    /// A second request was issued while one is still being generated.
    #[error("a reply is already being generated")]
    RequestInFlight,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
