//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Each variant
/// maps to one recoverable failure kind the calling surface reacts to
/// distinctly; infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive amount, empty title).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested entity does not exist (or is deleted).
    #[error("not found")]
    NotFound,

    /// A state transition was attempted from a state that does not allow it
    /// (e.g. deciding a donation that is no longer pending).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A conflicting condition blocks the operation (pending donations on
    /// delete, deleted campaign on approval, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting identity is not eligible for this operation.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }
}
