//! Pure eligibility checks at the ledger boundary.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use thiserror::Error;

use crate::actor::Actor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("requires the admin role (actor has '{0}')")]
    NotAdmin(String),

    #[error("requires a verified identity")]
    NotVerified,
}

/// Donation decisions and campaign edits are administrator-only.
pub fn ensure_admin(actor: &Actor) -> Result<(), EligibilityError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(EligibilityError::NotAdmin(actor.role.as_str().to_string()))
    }
}

/// Campaign creation additionally requires a verified identity.
pub fn ensure_verified_admin(actor: &Actor) -> Result<(), EligibilityError> {
    ensure_admin(actor)?;
    if actor.is_verified() {
        Ok(())
    } else {
        Err(EligibilityError::NotVerified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorId, VerificationStatus};
    use crate::roles::Role;

    fn actor(role: Role, status: VerificationStatus) -> Actor {
        Actor::new(ActorId::new(), role, status)
    }

    #[test]
    fn admin_passes_admin_check() {
        let a = actor(Role::admin(), VerificationStatus::Verified);
        assert!(ensure_admin(&a).is_ok());
    }

    #[test]
    fn donor_fails_admin_check() {
        let a = actor(Role::donor(), VerificationStatus::Verified);
        let err = ensure_admin(&a).unwrap_err();
        assert!(matches!(err, EligibilityError::NotAdmin(_)));
    }

    #[test]
    fn unverified_admin_cannot_create_campaigns() {
        let a = actor(Role::admin(), VerificationStatus::Pending);
        assert!(ensure_admin(&a).is_ok());
        let err = ensure_verified_admin(&a).unwrap_err();
        assert_eq!(err, EligibilityError::NotVerified);
    }
}
