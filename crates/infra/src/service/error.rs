//! Service-boundary error model.

use thiserror::Error;

use carefund_auth::EligibilityError;
use carefund_core::DomainError;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStoreError;

/// Error surfaced by every ledger operation.
///
/// The four recoverable kinds of the public contract are kept distinct so
/// callers can react precisely (refresh stale state, show a guard message,
/// ...). `Internal` covers infrastructure failures that are not the caller's
/// fault and carry no recovery protocol.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input: non-positive amount/goal, empty required text.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown id (or a campaign that is deleted/inactive at intake).
    #[error("not found")]
    NotFound,

    /// Transition attempted from a non-pending donation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Deletion blocked by pending donations, or approval blocked by a
    /// deleted campaign.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting identity is not eligible for this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Store/serialization failure; the operation left no partial state.
    #[error("internal ledger failure: {0}")]
    Internal(String),
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::NotFound => LedgerError::NotFound,
            DomainError::InvalidState(msg) => LedgerError::InvalidState(msg),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::Unauthorized => LedgerError::Unauthorized("not eligible".to_string()),
        }
    }
}

impl From<DispatchError> for LedgerError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) => LedgerError::Validation(msg),
            DispatchError::InvalidState(msg) => LedgerError::InvalidState(msg),
            // A lost optimistic-concurrency race is a conflict the caller can
            // retry against fresh state.
            DispatchError::Concurrency(msg) | DispatchError::Conflict(msg) => {
                LedgerError::Conflict(msg)
            }
            DispatchError::Unauthorized => LedgerError::Unauthorized("not eligible".to_string()),
            DispatchError::NotFound => LedgerError::NotFound,
            DispatchError::Deserialize(msg) => LedgerError::Internal(msg),
            DispatchError::Store(e) => LedgerError::Internal(format!("{e:?}")),
            DispatchError::Publish(msg) => LedgerError::Internal(msg),
        }
    }
}

impl From<EventStoreError> for LedgerError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => LedgerError::Conflict(msg),
            other => LedgerError::Internal(format!("{other:?}")),
        }
    }
}

impl From<EligibilityError> for LedgerError {
    fn from(value: EligibilityError) -> Self {
        LedgerError::Unauthorized(value.to_string())
    }
}
