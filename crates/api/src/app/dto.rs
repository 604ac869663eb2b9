use chrono::NaiveDate;
use serde::Deserialize;

use carefund_campaigns::{CampaignKind, CampaignUpdate, FundUtilizationLine};
use carefund_infra::CampaignDraft;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    pub title: String,
    pub category: String,
    pub about: Vec<String>,
    pub organizer: String,
    pub hospital: String,
    #[serde(default = "default_kind")]
    pub kind: CampaignKind,
    pub goal: u64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub fund_utilization: Vec<FundUtilizationLine>,
    #[serde(default)]
    pub updates: Vec<CampaignUpdate>,
}

fn default_kind() -> CampaignKind {
    CampaignKind::Campaign
}

fn default_true() -> bool {
    true
}

impl CampaignRequest {
    pub fn into_draft(self) -> CampaignDraft {
        CampaignDraft {
            title: self.title,
            category: self.category,
            about: self.about,
            organizer: self.organizer,
            hospital: self.hospital,
            kind: self.kind,
            goal: self.goal,
            is_active: self.is_active,
            deadline: self.deadline,
            fund_utilization: self.fund_utilization,
            updates: self.updates,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitDonationRequest {
    pub campaign_id: String,
    /// Whole currency units; non-positive values are rejected by the ledger.
    pub amount: i64,
    /// Explicit anonymity marker; otherwise the donation is attributed to
    /// the calling actor.
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub card_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectDonationRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    /// Filter by visibility flag.
    #[serde(default)]
    pub active: Option<bool>,
    /// Case-insensitive title substring.
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCampaignQuery {
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Deserialize)]
pub struct PendingDonationsQuery {
    #[serde(default)]
    pub campaign_id: Option<String>,
}
