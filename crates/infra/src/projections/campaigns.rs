use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use thiserror::Error;

use carefund_campaigns::{
    CampaignEvent, CampaignFields, CampaignId, CampaignKind, CampaignUpdate, FundUtilizationLine,
};
use carefund_core::AggregateId;
use carefund_events::EventEnvelope;

use crate::read_model::ReadModelStore;

/// Queryable campaign read model: the public projection of a campaign.
///
/// `raised` lives in the funding projection; the service merges the two when
/// building views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignReadModel {
    pub campaign_id: CampaignId,
    pub title: String,
    pub category: String,
    pub about: Vec<String>,
    pub organizer: String,
    pub hospital: String,
    pub kind: CampaignKind,
    pub goal: u64,
    pub is_active: bool,
    pub deadline: Option<NaiveDate>,
    pub fund_utilization: Vec<FundUtilizationLine>,
    pub updates: Vec<CampaignUpdate>,
}

impl CampaignReadModel {
    fn from_fields(campaign_id: CampaignId, fields: CampaignFields) -> Self {
        Self {
            campaign_id,
            title: fields.title,
            category: fields.category,
            about: fields.about,
            organizer: fields.organizer,
            hospital: fields.hospital,
            kind: fields.kind,
            goal: fields.goal,
            is_active: fields.is_active,
            deadline: fields.deadline,
            fund_utilization: fields.fund_utilization,
            updates: fields.updates,
        }
    }
}

#[derive(Debug, Error)]
pub enum CampaignProjectionError {
    #[error("failed to deserialize campaign event: {0}")]
    Deserialize(String),

    #[error("event campaign_id does not match envelope aggregate_id")]
    AggregateMismatch,

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Campaign directory projection.
///
/// Consumes published envelopes (JSON payloads) and maintains a read model
/// for campaigns, suitable for lookup and the list/search surface. Deleted
/// campaigns drop out of the directory; their history stays in the store.
#[derive(Debug)]
pub struct CampaignDirectoryProjection<S>
where
    S: ReadModelStore<CampaignId, CampaignReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> CampaignDirectoryProjection<S>
where
    S: ReadModelStore<CampaignId, CampaignReadModel>,
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

    /// Query read model for one campaign.
    pub fn get(&self, campaign_id: &CampaignId) -> Option<CampaignReadModel> {
        self.store.get(campaign_id)
    }

    /// List all campaigns in the directory.
    pub fn list(&self) -> Vec<CampaignReadModel> {
        self.store.list()
    }

    /// Simple in-memory search by title substring (case-insensitive).
    pub fn search_by_title(&self, query: &str) -> Vec<CampaignReadModel> {
        let q = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|rm| rm.title.to_lowercase().contains(&q))
            .collect()
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Ignores non-campaign aggregates (allows sharing a bus across modules).
    /// - Enforces monotonic sequence per aggregate stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CampaignProjectionError> {
        if envelope.aggregate_type() != "campaigns.campaign" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(aggregate_id);

        if seq == 0 {
            return Err(CampaignProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(CampaignProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: CampaignEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CampaignProjectionError::Deserialize(e.to_string()))?;

        let campaign_id = match &event {
            CampaignEvent::CampaignCreated(e) => e.campaign_id,
            CampaignEvent::CampaignUpdated(e) => e.campaign_id,
            CampaignEvent::CampaignDeleted(e) => e.campaign_id,
        };

        if campaign_id.0 != aggregate_id {
            return Err(CampaignProjectionError::AggregateMismatch);
        }

        match event {
            CampaignEvent::CampaignCreated(e) => {
                self.store.upsert(
                    e.campaign_id,
                    CampaignReadModel::from_fields(e.campaign_id, e.fields),
                );
            }
            CampaignEvent::CampaignUpdated(e) => {
                self.store.upsert(
                    e.campaign_id,
                    CampaignReadModel::from_fields(e.campaign_id, e.fields),
                );
            }
            CampaignEvent::CampaignDeleted(e) => {
                self.store.remove(&e.campaign_id);
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
    ) -> Result<(), CampaignProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        // Deterministic replay order: aggregate, then sequence.
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid(), e.sequence_number()));

        for env in envs {
            self.apply_envelope(&env)?;
        }

        Ok(())
    }
}
