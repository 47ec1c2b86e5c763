//! Domain-specific error types for the beam protocol.
//!
//! All fallible operations return `Result<T, BeamError>`.
//! Every error here is local and recoverable — none of them should
//! bring down the relay process.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the beam protocol.
#[derive(Debug, Error)]
pub enum BeamError {
    // ── Session Errors ───────────────────────────────────────────
    /// A second connection requested the host role while one is active.
    #[error("only one host can connect at a time")]
    RoleConflict,

    // ── Transfer Errors ──────────────────────────────────────────
    /// The assembled transfer does not match the announced length.
    #[error("transfer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The assembled transfer failed digest verification.
    #[error("transfer checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// A transfer header line could not be parsed.
    #[error("invalid transfer header: {0}")]
    InvalidHeader(&'static str),

    // ── Control Errors ───────────────────────────────────────────
    /// A control command named a kind this peer does not understand.
    #[error("unknown control command: {0}")]
    UnknownCommand(String),

    /// A control command had the wrong arity or non-numeric arguments.
    #[error("malformed control command: {0}")]
    MalformedCommand(String),

    // ── Framing Errors ───────────────────────────────────────────
    /// A wire frame exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A wire frame was structurally invalid.
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    /// A text frame was not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for BeamError {
    fn from(s: String) -> Self {
        BeamError::Other(s)
    }
}

impl From<&str> for BeamError {
    fn from(s: &str) -> Self {
        BeamError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BeamError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BeamError::ChannelClosed
    }
}
