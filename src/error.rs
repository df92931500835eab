//! Error types for replica administration commands

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by replica lifecycle commands
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AdminError {
    /// Invalid command input: unknown collection/shard/replica, a count
    /// that cannot be satisfied, or a failed `only_if_down` guard.
    /// Always raised before any mutation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The proposed removal set would break placement policy.
    #[error("Placement violation: {0}")]
    PlacementViolation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Deletion could not be completed after dispatch.
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Metadata store error: {0}")]
    MetadataStore(String),

    /// The surrounding task was cancelled while waiting.
    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl AdminError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            AdminError::BadRequest(_) => "bad_request",
            AdminError::PlacementViolation(_) => "placement_violation",
            AdminError::Timeout(_) => "timeout",
            AdminError::ServerError(_) => "server_error",
            AdminError::MetadataStore(_) => "metadata_store",
            AdminError::Interrupted(_) => "interrupted",
        }
    }

    /// Whether the error was raised before any cluster mutation was attempted
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            AdminError::BadRequest(_) | AdminError::PlacementViolation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
