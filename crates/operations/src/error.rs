//! Error types for the operations services.

use database::DatabaseError;
use thiserror::Error;
use workflow_core::{StatusParseError, TransitionError};

/// Errors that can occur in the operations services.
#[derive(Debug, Error)]
pub enum OperationsError {
    /// Persistence failed or a row was missing.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The post's status does not allow the action.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A stored status string is not one we know.
    #[error(transparent)]
    Status(#[from] StatusParseError),

    /// The telecaller has no business developer to hand leads to.
    #[error("telecaller {telecaller_id} has no business developer mapping")]
    NoBusinessDeveloperMapping { telecaller_id: i64 },

    /// No brand head serves the client's package.
    #[error("no brand head serves package {package}")]
    NoBrandHead { package: String },

    /// The lead cannot move from its current status.
    #[error("lead {lead_id} is {status}: {reason}")]
    InvalidLeadState {
        lead_id: i64,
        status: String,
        reason: &'static str,
    },

    /// No brand head has the package in their pool.
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// Caller input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl OperationsError {
    /// Whether retrying the same call could succeed.
    ///
    /// Only database I/O is transient. Missing rows, invalid transitions,
    /// missing mappings and validation failures are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OperationsError::Database(DatabaseError::Sqlx(_))
                | OperationsError::Database(DatabaseError::Migration(_))
        )
    }
}

/// Result type for operations.
pub type Result<T> = std::result::Result<T, OperationsError>;
