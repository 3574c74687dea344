//! Error types for the core crate.

use thiserror::Error;

/// Endorsement service error type.
#[derive(Error, Debug)]
pub enum EndorsementError {
    /// Required input is missing or blank.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller may not act on behalf of the organization.
    #[error("Caller has no access to organization {org_mrn}")]
    Forbidden {
        /// Organization the caller tried to act for.
        org_mrn: String,
    },

    /// No endorsement exists for the requested key.
    #[error("Endorsement not found")]
    NotFound,

    /// The backing store failed.
    #[error("Store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl EndorsementError {
    /// Whether this is the non-fault "absent" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EndorsementError::NotFound)
    }
}

/// Result type alias for EndorsementError.
pub type Result<T> = std::result::Result<T, EndorsementError>;
