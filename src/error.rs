//! Error taxonomy surfaced to the front end.
//!
//! Audio and network internals use [`anyhow`] with context; the job boundary
//! folds those into one of the categories below so the caller can decide how
//! to present it (blocking dialog, status line, exit code).

/// Every way a render attempt can fail.
#[derive(Debug, thiserror::Error)]
pub enum CallbenchError {
    /// Missing external prerequisite: no API key and the prompt was
    /// cancelled, no usable output directory, unreadable settings file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Form input rejected before any job was created.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The speech service call failed (network, authentication, service).
    #[error("Speech synthesis failed: {0:#}")]
    Synthesis(anyhow::Error),

    /// Decoding the voice or music, mixing, or exporting failed.
    #[error("Mixing failed: {0:#}")]
    Mix(anyhow::Error),

    /// Filesystem error outside the audio pipeline.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the crate's public API.
pub type Result<T, E = CallbenchError> = std::result::Result<T, E>;
