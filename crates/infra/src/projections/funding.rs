use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use carefund_campaigns::CampaignId;
use carefund_core::AggregateId;
use carefund_donations::DonationEvent;
use carefund_events::EventEnvelope;

use crate::read_model::ReadModelStore;

/// Read model: per-campaign funding totals.
///
/// `raised` is derived: the exact integer sum of approved donation amounts
/// for the campaign. It is written by this projection only, and only in
/// response to a `DonationApproved` fact, so it cannot drift from the
/// approved set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignFunding {
    pub campaign_id: CampaignId,
    /// Sum of approved donation amounts (whole currency units, exact).
    pub raised: u64,
    /// Money awaiting review, not yet part of `raised`.
    pub pending_amount: u64,
    pub pending_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
}

impl CampaignFunding {
    pub fn new(campaign_id: CampaignId) -> Self {
        Self {
            campaign_id,
            raised: 0,
            pending_amount: 0,
            pending_count: 0,
            approved_count: 0,
            rejected_count: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum FundingProjectionError {
    #[error("failed to deserialize donation event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Campaign funding projection: aggregates donation money per campaign.
///
/// Consumes donation events (keyed by the owning campaign) the way an
/// account-balance projection consumes journal postings: every fold is an
/// exact integer add/subtract, idempotent under at-least-once delivery via
/// per-stream cursors. Concurrent approvals of distinct donations land as
/// distinct facts, so no increment can be lost to a read-modify-write race.
#[derive(Debug)]
pub struct CampaignFundingProjection<S>
where
    S: ReadModelStore<CampaignId, CampaignFunding>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> CampaignFundingProjection<S>
where
    S: ReadModelStore<CampaignId, CampaignFunding>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn get_cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn update_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    /// Funding totals for one campaign (zeroes if it has no donations yet).
    pub fn get(&self, campaign_id: CampaignId) -> CampaignFunding {
        self.store
            .get(&campaign_id)
            .unwrap_or_else(|| CampaignFunding::new(campaign_id))
    }

    /// The derived `raised` aggregate for one campaign.
    pub fn raised(&self, campaign_id: CampaignId) -> u64 {
        self.get(campaign_id).raised
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), FundingProjectionError> {
        if envelope.aggregate_type() != "donations.donation" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(aggregate_id);

        if seq == 0 {
            return Err(FundingProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(FundingProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: DonationEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| FundingProjectionError::Deserialize(e.to_string()))?;

        match event {
            DonationEvent::DonationSubmitted(e) => {
                let mut funding = self.get(e.campaign_id);
                funding.pending_amount = funding.pending_amount.saturating_add(e.amount.get());
                funding.pending_count = funding.pending_count.saturating_add(1);
                self.store.upsert(e.campaign_id, funding);
            }
            DonationEvent::DonationApproved(e) => {
                let mut funding = self.get(e.campaign_id);
                funding.pending_amount = funding.pending_amount.saturating_sub(e.amount.get());
                funding.pending_count = funding.pending_count.saturating_sub(1);
                funding.raised = funding.raised.saturating_add(e.amount.get());
                funding.approved_count = funding.approved_count.saturating_add(1);
                self.store.upsert(e.campaign_id, funding);
            }
            DonationEvent::DonationRejected(e) => {
                let mut funding = self.get(e.campaign_id);
                funding.pending_amount = funding.pending_amount.saturating_sub(e.amount.get());
                funding.pending_count = funding.pending_count.saturating_sub(1);
                funding.rejected_count = funding.rejected_count.saturating_add(1);
                self.store.upsert(e.campaign_id, funding);
            }
        }

        self.update_cursor(aggregate_id, seq);

        Ok(())
    }

    /// Rebuild the totals from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), FundingProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid(), e.sequence_number()));

        for env in envs {
            self.apply_envelope(&env)?;
        }

        Ok(())
    }
}
