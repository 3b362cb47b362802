//! Error types for the content policy engine and its messaging layer.

use std::path::PathBuf;
use thiserror::Error;

/// Policy-level errors: configuration, filter lists, logging setup, CLI input.
///
/// Deciding on a well-formed request never produces one of these; a request
/// that matches nothing is a successful "no filter applied" outcome.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to read filter list {path:?}: {source}")]
    FilterListIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid frame location: {0}")]
    InvalidLocation(String),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for PolicyError {
    fn from(err: config::ConfigError) -> Self {
        PolicyError::ConfigError(err.to_string())
    }
}

/// Errors surfaced by the cross-context messaging layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Port disconnected while awaiting response to '{0}'")]
    Disconnected(String),

    #[error("Port is closed, cannot send '{0}'")]
    Closed(String),

    #[error(
        "Synchronous request '{0}' would re-enter a peer that is blocked on this port"
    )]
    Reentrant(String),

    #[error("Timed out waiting for response to '{0}'")]
    Timeout(String),

    #[error("No connected peer to receive '{0}'")]
    NoRecipients(String),

    #[error("Failed to encode payload for '{message}': {reason}")]
    Encode { message: String, reason: String },

    #[error("Failed to decode response to '{message}': {reason}")]
    Decode { message: String, reason: String },
}
