//! Error types for stream-sync.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`EngineError`]): prevent the engine from starting
//! - **Transient conditions**: ring underrun and overflow are expected
//!   steady-state behavior, handled in-band (silence / truncation) and
//!   never surfaced as errors

use std::path::PathBuf;

/// Fatal errors that prevent the synchronization engine from starting.
///
/// Once the engine is running, no operation on the hot path returns an
/// error: empty reads yield silence, full writes truncate, and the
/// banding logic drives occupancy back toward the setpoint on subsequent
/// invocations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed format parameters (zero rate, zero channels, zero
    /// nominal chunk size).
    ///
    /// Never silently clamped: an incorrect setpoint would corrupt the
    /// feedback loop for the whole session.
    #[error("invalid audio format: {reason}")]
    InvalidFormat {
        /// Which parameter was rejected and why.
        reason: String,
    },

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoOutputDevice,

    /// The session sample format is not supported by the output device.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    Backend(String),

    /// A sink failed during initialization.
    #[error("sink '{sink_name}' failed to start: {reason}")]
    SinkStartFailed {
        /// Name of the sink that failed.
        sink_name: String,
        /// Why the sink failed to start.
        reason: String,
    },
}

impl EngineError {
    /// Creates an [`EngineError::InvalidFormat`] with the given reason.
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Creates an [`EngineError::Backend`] from any displayable error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Errors that can occur within a [`Sink`](crate::Sink) implementation.
///
/// Sink errors are recoverable - the engine logs them and surfaces a
/// [`StreamEvent::SinkError`](crate::StreamEvent::SinkError); playback
/// continues without the failing sink's output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// File I/O error.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}
