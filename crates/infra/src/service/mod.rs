//! The ledger service: composition root and the only public entry point.
//!
//! Composes the event store, command dispatcher, projections, and audit
//! trail behind the operation table of the public contract, and enforces the
//! invariants that span both aggregates:
//!
//! - no approval of a donation for a deleted campaign
//! - no campaign deletion that silently orphans pending money
//! - `raised` moves only through donation-state transitions
//!
//! Concurrency model: every operation that touches a campaign's shared state
//! (submit, approve, reject, update, delete) runs inside that campaign's
//! exclusive section, taken from a lock registry. Concurrent deciders of the
//! same donation therefore serialize: exactly one wins, the rest observe the
//! terminal state and get `InvalidState`. The optimistic-concurrency append
//! in the dispatcher stays on as defense in depth. Read-only operations read
//! projection snapshots and never enter an exclusive section.
//!
//! Campaign existence is always decided by rehydrating from the event store;
//! the projections are read-optimized copies folded synchronously from the
//! committed events before an operation returns, never a second source of
//! truth.

pub mod error;
pub mod views;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use carefund_auth::{Actor, ensure_admin, ensure_verified_admin};
use carefund_campaigns::{
    Campaign, CampaignCommand, CampaignId, CreateCampaign, DeleteCampaign, UpdateCampaign,
};
use carefund_core::{AggregateId, Amount};
use carefund_donations::{
    ApproveDonation, Donation, DonationCommand, DonationId, DonorDetails, DonorRef,
    RejectDonation, SubmitDonation,
};
use carefund_events::{EventEnvelope, InMemoryEventBus};

use crate::audit::AuditTrail;
use crate::command_dispatcher::CommandDispatcher;
use crate::event_store::{InMemoryEventStore, StoredEvent};
use crate::projections::{
    CampaignDirectoryProjection, CampaignFunding, CampaignFundingProjection, CampaignReadModel,
    DonationReadModel, DonationRegisterProjection,
};
use crate::read_model::InMemoryReadModelStore;

pub use error::LedgerError;
pub use views::{CampaignDraft, CampaignFilter, CampaignView, DonationFilter, DonationView};

const CAMPAIGN_AGGREGATE: &str = "campaigns.campaign";
const DONATION_AGGREGATE: &str = "donations.donation";

/// Reason recorded on donations rejected by an explicit cascade delete.
const CASCADE_REJECT_REASON: &str = "campaign deleted";

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

/// Campaign funding ledger service.
pub struct LedgerService {
    dispatcher: CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
    store: Arc<InMemoryEventStore>,
    bus: Bus,
    campaigns: CampaignDirectoryProjection<Arc<InMemoryReadModelStore<CampaignId, CampaignReadModel>>>,
    donations: DonationRegisterProjection<Arc<InMemoryReadModelStore<DonationId, DonationReadModel>>>,
    funding: CampaignFundingProjection<Arc<InMemoryReadModelStore<CampaignId, CampaignFunding>>>,
    audit: AuditTrail,
    campaign_locks: Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerService {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());

        Self {
            dispatcher: CommandDispatcher::new(store.clone(), bus.clone()),
            store,
            bus,
            campaigns: CampaignDirectoryProjection::new(Arc::new(InMemoryReadModelStore::new())),
            donations: DonationRegisterProjection::new(Arc::new(InMemoryReadModelStore::new())),
            funding: CampaignFundingProjection::new(Arc::new(InMemoryReadModelStore::new())),
            audit: AuditTrail::new(),
            campaign_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The audit trail of every mutation this service performed.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// The bus committed events are published on (for external consumers).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Recompute every read model from the event streams.
    ///
    /// `raised` is a derived value; this is the replay that proves it.
    pub fn rebuild_projections(&self) -> Result<(), LedgerError> {
        let envelopes: Vec<_> = self.store.all_events().iter().map(StoredEvent::to_envelope).collect();

        self.campaigns
            .rebuild_from_scratch(envelopes.clone())
            .map_err(|e| LedgerError::Internal(e.to_string()))?;
        self.donations
            .rebuild_from_scratch(envelopes.clone())
            .map_err(|e| LedgerError::Internal(e.to_string()))?;
        self.funding
            .rebuild_from_scratch(envelopes)
            .map_err(|e| LedgerError::Internal(e.to_string()))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Campaign operations
    // ---------------------------------------------------------------

    /// Create a campaign. Admin-only; the creator must be verified.
    pub fn create_campaign(
        &self,
        actor: &Actor,
        draft: CampaignDraft,
    ) -> Result<CampaignView, LedgerError> {
        ensure_verified_admin(actor)?;

        let aggregate_id = AggregateId::new();
        let campaign_id = CampaignId::new(aggregate_id);

        let committed = self.dispatcher.dispatch::<Campaign>(
            aggregate_id,
            CAMPAIGN_AGGREGATE,
            CampaignCommand::CreateCampaign(CreateCampaign {
                campaign_id,
                fields: draft.clone(),
                actor: actor.id,
                occurred_at: Utc::now(),
            }),
            |id| Campaign::empty(CampaignId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        tracing::info!(%campaign_id, title = %draft.title, "campaign created");
        self.record_audit(actor, &committed, json!({ "after": draft }));

        self.campaign_view(campaign_id)
    }

    /// Replace a campaign's editable fields. Admin-only.
    pub fn update_campaign(
        &self,
        actor: &Actor,
        campaign_id: CampaignId,
        draft: CampaignDraft,
    ) -> Result<CampaignView, LedgerError> {
        ensure_admin(actor)?;

        let lock = self.campaign_lock(campaign_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let before = self.load_campaign(campaign_id)?;
        if !before.exists() {
            return Err(LedgerError::NotFound);
        }
        let before_fields = before.fields().clone();

        let committed = self.dispatcher.dispatch::<Campaign>(
            campaign_id.0,
            CAMPAIGN_AGGREGATE,
            CampaignCommand::UpdateCampaign(UpdateCampaign {
                campaign_id,
                fields: draft.clone(),
                actor: actor.id,
                occurred_at: Utc::now(),
            }),
            |id| Campaign::empty(CampaignId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        self.record_audit(
            actor,
            &committed,
            json!({ "before": before_fields, "after": draft }),
        );
        tracing::info!(%campaign_id, "campaign updated");

        self.campaign_view(campaign_id)
    }

    /// Delete a campaign.
    ///
    /// Hard-blocks with `Conflict` while pending donations reference the
    /// campaign. With `cascade`, every pending donation is rejected as part
    /// of the same exclusive section and each rejection is audited.
    pub fn delete_campaign(
        &self,
        actor: &Actor,
        campaign_id: CampaignId,
        cascade: bool,
    ) -> Result<(), LedgerError> {
        ensure_admin(actor)?;

        let lock = self.campaign_lock(campaign_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let campaign = self.load_campaign(campaign_id)?;
        if !campaign.exists() {
            return Err(LedgerError::NotFound);
        }

        let pending = self.donations.list_pending(Some(campaign_id));
        if !pending.is_empty() {
            if !cascade {
                return Err(LedgerError::Conflict(format!(
                    "campaign has {} pending donation(s); rejecting them requires an explicit cascade",
                    pending.len()
                )));
            }

            for rm in &pending {
                let committed = self.dispatcher.dispatch::<Donation>(
                    rm.donation_id.0,
                    DONATION_AGGREGATE,
                    DonationCommand::RejectDonation(RejectDonation {
                        donation_id: rm.donation_id,
                        decided_by: actor.id,
                        reason: Some(CASCADE_REJECT_REASON.to_string()),
                        occurred_at: Utc::now(),
                    }),
                    |id| Donation::empty(DonationId::new(id)),
                )?;

                self.apply_committed(&committed)?;
                self.record_audit(
                    actor,
                    &committed,
                    json!({
                        "cascade": true,
                        "campaign_id": campaign_id,
                        "amount": rm.amount,
                    }),
                );
            }
        }

        let committed = self.dispatcher.dispatch::<Campaign>(
            campaign_id.0,
            CAMPAIGN_AGGREGATE,
            CampaignCommand::DeleteCampaign(DeleteCampaign {
                campaign_id,
                actor: actor.id,
                occurred_at: Utc::now(),
            }),
            |id| Campaign::empty(CampaignId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        self.record_audit(
            actor,
            &committed,
            json!({ "cascade": cascade, "rejected_pending": pending.len() }),
        );
        tracing::info!(%campaign_id, cascade, rejected = pending.len(), "campaign deleted");

        Ok(())
    }

    /// Read one campaign with its recomputed funding totals.
    pub fn get_campaign(&self, campaign_id: CampaignId) -> Result<CampaignView, LedgerError> {
        self.campaign_view(campaign_id)
    }

    /// List campaigns, filtered by visibility and free-text title match.
    pub fn list_campaigns(&self, filter: &CampaignFilter) -> Vec<CampaignView> {
        let mut campaigns = match &filter.title_contains {
            Some(q) => self.campaigns.search_by_title(q),
            None => self.campaigns.list(),
        };

        if let Some(active) = filter.is_active {
            campaigns.retain(|rm| rm.is_active == active);
        }

        // UUIDv7 ids are time-ordered; sorting by id lists creation order.
        campaigns.sort_by_key(|rm| *rm.campaign_id.0.as_uuid());

        campaigns
            .into_iter()
            .map(|rm| {
                let funding = self.funding.get(rm.campaign_id);
                CampaignView::from_parts(rm, &funding)
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Donation operations
    // ---------------------------------------------------------------

    /// Submit a donation against a campaign. Any actor may donate.
    ///
    /// Payment completion is an opaque precondition satisfied upstream. The
    /// donation lands `pending`; the campaign's `raised` is untouched until
    /// an administrator approves it.
    pub fn submit_donation(
        &self,
        actor: &Actor,
        campaign_id: CampaignId,
        amount: i64,
        donor: DonorRef,
        details: DonorDetails,
    ) -> Result<DonationView, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::Validation("amount must be positive".to_string()));
        }
        let amount = Amount::new(amount as u64)?;

        let lock = self.campaign_lock(campaign_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Submitting to an unknown, deleted, or inactive campaign is rejected
        // at intake, not silently accepted and later rejected.
        let campaign = self.load_campaign(campaign_id)?;
        if !campaign.accepts_donations() {
            return Err(LedgerError::NotFound);
        }

        let aggregate_id = AggregateId::new();
        let donation_id = DonationId::new(aggregate_id);

        let committed = self.dispatcher.dispatch::<Donation>(
            aggregate_id,
            DONATION_AGGREGATE,
            DonationCommand::SubmitDonation(SubmitDonation {
                donation_id,
                campaign_id,
                amount,
                donor,
                details,
                occurred_at: Utc::now(),
            }),
            |id| Donation::empty(DonationId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        self.record_audit(
            actor,
            &committed,
            json!({ "campaign_id": campaign_id, "amount": amount, "donor": donor }),
        );
        tracing::info!(%donation_id, %campaign_id, amount = amount.get(), "donation submitted");

        self.donation_view(donation_id)
    }

    /// Approve a pending donation. Admin-only.
    ///
    /// One atomic unit inside the owning campaign's exclusive section:
    /// re-validate the campaign still exists, transition the donation, fold
    /// the approved amount into `raised`. A failure at any step leaves both
    /// the donation and the campaign totals exactly as they were.
    pub fn approve_donation(
        &self,
        actor: &Actor,
        donation_id: DonationId,
    ) -> Result<(DonationView, CampaignView), LedgerError> {
        ensure_admin(actor)?;

        let campaign_id = self.owning_campaign(donation_id)?;

        let lock = self.campaign_lock(campaign_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Money cannot be attributed to a non-existent campaign.
        let campaign = self.load_campaign(campaign_id)?;
        if !campaign.exists() {
            return Err(LedgerError::Conflict(
                "campaign was deleted after submission".to_string(),
            ));
        }

        let committed = self.dispatcher.dispatch::<Donation>(
            donation_id.0,
            DONATION_AGGREGATE,
            DonationCommand::ApproveDonation(ApproveDonation {
                donation_id,
                decided_by: actor.id,
                occurred_at: Utc::now(),
            }),
            |id| Donation::empty(DonationId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        self.record_audit(actor, &committed, json!({ "campaign_id": campaign_id }));

        let donation = self.donation_view(donation_id)?;
        let campaign = self.campaign_view(campaign_id)?;
        tracing::info!(
            %donation_id,
            %campaign_id,
            amount = donation.amount,
            raised = campaign.raised,
            "donation approved"
        );

        Ok((donation, campaign))
    }

    /// Reject a pending donation. Admin-only.
    ///
    /// Never touches funding totals, and stays permitted when the campaign
    /// was deleted after submission (clearing the backlog).
    pub fn reject_donation(
        &self,
        actor: &Actor,
        donation_id: DonationId,
        reason: Option<String>,
    ) -> Result<DonationView, LedgerError> {
        ensure_admin(actor)?;

        let campaign_id = self.owning_campaign(donation_id)?;

        let lock = self.campaign_lock(campaign_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let committed = self.dispatcher.dispatch::<Donation>(
            donation_id.0,
            DONATION_AGGREGATE,
            DonationCommand::RejectDonation(RejectDonation {
                donation_id,
                decided_by: actor.id,
                reason: reason.clone(),
                occurred_at: Utc::now(),
            }),
            |id| Donation::empty(DonationId::new(id)),
        )?;

        self.apply_committed(&committed)?;
        self.record_audit(
            actor,
            &committed,
            json!({ "campaign_id": campaign_id, "reason": reason }),
        );
        tracing::info!(%donation_id, %campaign_id, "donation rejected");

        self.donation_view(donation_id)
    }

    /// The admin review queue: pending donations, oldest first.
    pub fn list_pending_donations(&self, filter: &DonationFilter) -> Vec<DonationView> {
        self.donations
            .list_pending(filter.campaign_id)
            .into_iter()
            .map(DonationView::from)
            .collect()
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    /// The per-campaign serialization point.
    fn campaign_lock(&self, campaign_id: CampaignId) -> Arc<Mutex<()>> {
        let mut locks = self
            .campaign_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(campaign_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Rehydrate a campaign from its event stream (the source of truth for
    /// existence checks).
    fn load_campaign(&self, campaign_id: CampaignId) -> Result<Campaign, LedgerError> {
        Ok(self
            .dispatcher
            .rehydrate::<Campaign>(campaign_id.0, |id| Campaign::empty(CampaignId::new(id)))?)
    }

    /// Resolve the campaign a donation belongs to, or `NotFound`.
    fn owning_campaign(&self, donation_id: DonationId) -> Result<CampaignId, LedgerError> {
        let donation = self
            .dispatcher
            .rehydrate::<Donation>(donation_id.0, |id| Donation::empty(DonationId::new(id)))?;

        if !donation.exists() {
            return Err(LedgerError::NotFound);
        }

        donation
            .campaign_id()
            .ok_or_else(|| LedgerError::Internal("donation stream has no submission".to_string()))
    }

    /// Fold committed events into all read models before returning to the
    /// caller (read-your-writes). The bus has already fanned them out to any
    /// external subscribers; projection cursors make the folds idempotent.
    fn apply_committed(&self, committed: &[StoredEvent]) -> Result<(), LedgerError> {
        for stored in committed {
            let envelope = stored.to_envelope();
            self.campaigns
                .apply_envelope(&envelope)
                .map_err(|e| LedgerError::Internal(e.to_string()))?;
            self.donations
                .apply_envelope(&envelope)
                .map_err(|e| LedgerError::Internal(e.to_string()))?;
            self.funding
                .apply_envelope(&envelope)
                .map_err(|e| LedgerError::Internal(e.to_string()))?;
        }
        Ok(())
    }

    fn record_audit(&self, actor: &Actor, committed: &[StoredEvent], details: JsonValue) {
        for stored in committed {
            self.audit.record(
                actor.id,
                stored.event_type.clone(),
                stored.aggregate_id,
                stored.occurred_at,
                details.clone(),
            );
        }
    }

    fn campaign_view(&self, campaign_id: CampaignId) -> Result<CampaignView, LedgerError> {
        let rm = self.campaigns.get(&campaign_id).ok_or(LedgerError::NotFound)?;
        let funding = self.funding.get(campaign_id);
        Ok(CampaignView::from_parts(rm, &funding))
    }

    fn donation_view(&self, donation_id: DonationId) -> Result<DonationView, LedgerError> {
        self.donations
            .get(&donation_id)
            .map(DonationView::from)
            .ok_or(LedgerError::NotFound)
    }
}

impl core::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerService").finish_non_exhaustive()
    }
}
