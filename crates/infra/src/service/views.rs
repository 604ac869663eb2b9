//! Fully updated views returned by every ledger operation.
//!
//! Callers never re-derive aggregates client-side: a campaign view always
//! carries the recomputed `raised`, a donation view always carries the
//! post-transition state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use carefund_auth::ActorId;
use carefund_campaigns::{CampaignId, CampaignKind, CampaignUpdate, FundUtilizationLine};
use carefund_donations::{DonationId, DonationState, DonorRef};

use crate::projections::{CampaignFunding, CampaignReadModel, DonationReadModel};

/// The editable field set accepted by create/update.
pub type CampaignDraft = carefund_campaigns::CampaignFields;

/// A campaign as callers see it: directory fields plus funding totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignView {
    pub campaign_id: CampaignId,
    pub title: String,
    pub category: String,
    pub about: Vec<String>,
    pub organizer: String,
    pub hospital: String,
    pub kind: CampaignKind,
    pub goal: u64,
    /// Derived: exact sum of approved donation amounts.
    pub raised: u64,
    pub is_active: bool,
    pub deadline: Option<NaiveDate>,
    pub fund_utilization: Vec<FundUtilizationLine>,
    pub updates: Vec<CampaignUpdate>,
    /// Money awaiting review (not part of `raised`).
    pub pending_amount: u64,
    pub pending_count: u32,
}

impl CampaignView {
    pub(crate) fn from_parts(rm: CampaignReadModel, funding: &CampaignFunding) -> Self {
        Self {
            campaign_id: rm.campaign_id,
            title: rm.title,
            category: rm.category,
            about: rm.about,
            organizer: rm.organizer,
            hospital: rm.hospital,
            kind: rm.kind,
            goal: rm.goal,
            raised: funding.raised,
            is_active: rm.is_active,
            deadline: rm.deadline,
            fund_utilization: rm.fund_utilization,
            updates: rm.updates,
            pending_amount: funding.pending_amount,
            pending_count: funding.pending_count,
        }
    }
}

/// A donation as callers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationView {
    pub donation_id: DonationId,
    pub campaign_id: CampaignId,
    pub amount: u64,
    pub donor: DonorRef,
    pub email: Option<String>,
    pub card_name: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub state: DonationState,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<ActorId>,
    pub reject_reason: Option<String>,
}

impl From<DonationReadModel> for DonationView {
    fn from(rm: DonationReadModel) -> Self {
        Self {
            donation_id: rm.donation_id,
            campaign_id: rm.campaign_id,
            amount: rm.amount,
            donor: rm.donor,
            email: rm.email,
            card_name: rm.card_name,
            submitted_at: rm.submitted_at,
            state: rm.state,
            decided_at: rm.decided_at,
            decided_by: rm.decided_by,
            reject_reason: rm.reject_reason,
        }
    }
}

/// Campaign listing filter: visibility and free-text title match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    pub is_active: Option<bool>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
}

/// Pending-donation listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DonationFilter {
    pub campaign_id: Option<CampaignId>,
}
