//! Error types for the Trestle client.
//!
//! # Design
//! Every failure carries a human-readable message and displays as exactly
//! that message, so callers that only care about text can use `to_string()`.
//! The variant tags where the failure came from: a pre-flight check that
//! never reached the network, the remote service answering with a non-2xx
//! status, or the transport failing to get an answer at all.

use thiserror::Error;

/// Message used when a non-2xx body carries no usable `error` field.
pub fn fallback_message(status: u16) -> String {
    format!("request failed with HTTP status {status}")
}

/// Errors returned by every `Trestle` operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrestleError {
    /// A pre-flight check failed; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The service answered with a status outside 200..=299.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// No response was obtained (DNS, connect timeout, TLS, I/O).
    #[error("{0}")]
    Transport(String),

    /// A 2xx body could not be decoded as JSON.
    #[error("{0}")]
    Decode(String),

    /// Client construction failed.
    #[error("{0}")]
    Config(String),
}

/// Coarse classification of a `TrestleError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Remote,
    Transport,
    Decode,
    Config,
}

impl TrestleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrestleError::Validation(_) => ErrorKind::Validation,
            TrestleError::Remote { .. } => ErrorKind::Remote,
            TrestleError::Transport(_) => ErrorKind::Transport,
            TrestleError::Decode(_) => ErrorKind::Decode,
            TrestleError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TrestleError::Validation(msg)
            | TrestleError::Transport(msg)
            | TrestleError::Decode(msg)
            | TrestleError::Config(msg) => msg,
            TrestleError::Remote { message, .. } => message,
        }
    }

    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrestleError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrestleError>;
