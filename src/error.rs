//!
//! Defines error types for causal delivery.

use crate::types::{MessageId, ProcessId};

/// Convenience alias used throughout the crate.
pub type CausalResult<T> = Result<T, CausalError>;

/// Errors raised while sending, receiving or bootstrapping processes.
///
/// Gate evaluation and clock merging never fail on well-formed input; every
/// variant here describes malformed input or an exhausted resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CausalError {
    /// A sender or recipient id lies outside `[0, num_processes)`.
    #[error("process id {id} is outside the group of {num_processes} processes")]
    InvalidProcessId { id: usize, num_processes: usize },
    /// An arriving snapshot does not have one entry per process.
    #[error("malformed vector snapshot: expected {expected} entries, got {actual}")]
    MalformedSnapshot { expected: usize, actual: usize },
    /// The hold-back queue of `process` is at its configured capacity.
    #[error("pending queue of {process} is full (capacity {capacity})")]
    BackpressureExceeded { process: ProcessId, capacity: usize },
    /// A message was handed to a process that is not among its recipients.
    #[error("{process} is not a recipient of message {message}")]
    NotARecipient { process: ProcessId, message: MessageId },
    /// `send` was called with an empty recipient list.
    #[error("message has no recipients")]
    NoRecipients,
    /// The group configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A transport endpoint has gone away.
    #[error("transport error: {0}")]
    Transport(String),
    /// Loading the configuration failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while reading a [`crate::config::GroupConfig`] from disk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
