//! Actor identity consumed by the ledger.
//!
//! The ledger never authenticates anyone: it receives an already-
//! authenticated actor (id + role + verification status) on every call and
//! only runs pure eligibility checks against it.

pub mod actor;
pub mod eligibility;
pub mod roles;

pub use actor::{Actor, ActorId, VerificationStatus};
pub use eligibility::{EligibilityError, ensure_admin, ensure_verified_admin};
pub use roles::Role;
