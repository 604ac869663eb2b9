//! Audit trail: who did what, to which entity, and what changed.
//!
//! Every mutation of the ledger appends a record here in the same operation
//! that commits the events. The event streams remain the source of record;
//! the trail is the queryable projection of accountability over them.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use carefund_auth::ActorId;
use carefund_core::AggregateId;

/// One audited mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: Uuid,
    pub actor: ActorId,
    /// Stable action name, matching the committed event type
    /// (e.g. "donations.donation.approved").
    pub action: String,
    pub entity_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
    /// Action-specific detail: before/after snapshots of changed fields,
    /// amounts, cascade provenance.
    pub details: JsonValue,
}

/// Append-only audit trail.
///
/// In-memory like the reference event store; a durable backend would persist
/// these rows alongside the entities.
#[derive(Debug, Default)]
pub struct AuditTrail {
    records: RwLock<Vec<AuditRecord>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Lock poisoning only drops audit visibility for the
    /// crashed process; the event streams still carry the full history.
    pub fn record(
        &self,
        actor: ActorId,
        action: impl Into<String>,
        entity_id: AggregateId,
        occurred_at: DateTime<Utc>,
        details: JsonValue,
    ) {
        let record = AuditRecord {
            record_id: Uuid::now_v7(),
            actor,
            action: action.into(),
            entity_id,
            occurred_at,
            details,
        };

        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    /// All records, in append order.
    pub fn all(&self) -> Vec<AuditRecord> {
        match self.records.read() {
            Ok(records) => records.clone(),
            Err(_) => vec![],
        }
    }

    /// Records touching one entity, in append order.
    pub fn for_entity(&self, entity_id: AggregateId) -> Vec<AuditRecord> {
        match self.records.read() {
            Ok(records) => records
                .iter()
                .filter(|r| r.entity_id == entity_id)
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }
}
