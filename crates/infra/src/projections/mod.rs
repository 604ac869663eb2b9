//! Projection implementations (read model builders).
//!
//! Projections consume domain events and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: can be reconstructed from the event stream
//! - **Idempotent**: safe for at-least-once delivery
//!
//! The funding projection is the only writer of `raised` anywhere in the
//! system, and it only ever folds `DonationApproved` facts - which is what
//! keeps the derived aggregate from drifting.

pub mod campaigns;
pub mod donations;
pub mod funding;

pub use campaigns::{CampaignDirectoryProjection, CampaignProjectionError, CampaignReadModel};
pub use donations::{DonationProjectionError, DonationReadModel, DonationRegisterProjection};
pub use funding::{CampaignFunding, CampaignFundingProjection, FundingProjectionError};
