use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use carefund_auth::ActorId;
use carefund_campaigns::CampaignId;
use carefund_core::AggregateId;
use carefund_donations::{DonationEvent, DonationId, DonationState, DonorRef};
use carefund_events::EventEnvelope;

use crate::read_model::ReadModelStore;

/// Queryable donation read model, including the admin review surface's
/// pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationReadModel {
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

#[derive(Debug, Error)]
pub enum DonationProjectionError {
    #[error("failed to deserialize donation event: {0}")]
    Deserialize(String),

    #[error("event donation_id does not match envelope aggregate_id")]
    AggregateMismatch,

    #[error("decision event for unknown donation {0}")]
    UnknownDonation(DonationId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Donation register projection.
///
/// Maintains one read model per donation; financial history is append-only,
/// so records are only ever inserted or settled, never removed.
#[derive(Debug)]
pub struct DonationRegisterProjection<S>
where
    S: ReadModelStore<DonationId, DonationReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> DonationRegisterProjection<S>
where
    S: ReadModelStore<DonationId, DonationReadModel>,
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

    /// Query read model for one donation.
    pub fn get(&self, donation_id: &DonationId) -> Option<DonationReadModel> {
        self.store.get(donation_id)
    }

    /// List all donations.
    pub fn list(&self) -> Vec<DonationReadModel> {
        self.store.list()
    }

    /// The admin review queue: pending donations, optionally scoped to one
    /// campaign, oldest first.
    pub fn list_pending(&self, campaign_id: Option<CampaignId>) -> Vec<DonationReadModel> {
        let mut pending: Vec<_> = self
            .list()
            .into_iter()
            .filter(|rm| rm.state == DonationState::Pending)
            .filter(|rm| campaign_id.is_none_or(|id| rm.campaign_id == id))
            .collect();
        pending.sort_by_key(|rm| rm.submitted_at);
        pending
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Ignores non-donation aggregates (allows sharing a bus across modules).
    /// - Enforces monotonic sequence per aggregate stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), DonationProjectionError> {
        if envelope.aggregate_type() != "donations.donation" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(aggregate_id);

        if seq == 0 {
            return Err(DonationProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(DonationProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: DonationEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| DonationProjectionError::Deserialize(e.to_string()))?;

        let donation_id = match &event {
            DonationEvent::DonationSubmitted(e) => e.donation_id,
            DonationEvent::DonationApproved(e) => e.donation_id,
            DonationEvent::DonationRejected(e) => e.donation_id,
        };

        if donation_id.0 != aggregate_id {
            return Err(DonationProjectionError::AggregateMismatch);
        }

        match event {
            DonationEvent::DonationSubmitted(e) => {
                self.store.upsert(
                    e.donation_id,
                    DonationReadModel {
                        donation_id: e.donation_id,
                        campaign_id: e.campaign_id,
                        amount: e.amount.get(),
                        donor: e.donor,
                        email: e.details.email,
                        card_name: e.details.card_name,
                        submitted_at: e.occurred_at,
                        state: DonationState::Pending,
                        decided_at: None,
                        decided_by: None,
                        reject_reason: None,
                    },
                );
            }
            DonationEvent::DonationApproved(e) => {
                let mut rm = self
                    .store
                    .get(&e.donation_id)
                    .ok_or(DonationProjectionError::UnknownDonation(e.donation_id))?;
                rm.state = DonationState::Approved;
                rm.decided_at = Some(e.occurred_at);
                rm.decided_by = Some(e.decided_by);
                self.store.upsert(e.donation_id, rm);
            }
            DonationEvent::DonationRejected(e) => {
                let mut rm = self
                    .store
                    .get(&e.donation_id)
                    .ok_or(DonationProjectionError::UnknownDonation(e.donation_id))?;
                rm.state = DonationState::Rejected;
                rm.decided_at = Some(e.occurred_at);
                rm.decided_by = Some(e.decided_by);
                rm.reject_reason = e.reason;
                self.store.upsert(e.donation_id, rm);
            }
        }

        // Advance cursor after successful apply.
        self.update_cursor(aggregate_id, seq);

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), DonationProjectionError> {
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
