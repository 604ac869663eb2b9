use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use carefund_auth::ActorId;
use carefund_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use carefund_events::Event;

/// Campaign identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub AggregateId);

impl CampaignId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Campaign kind: an individual fundraising cause or an NGO profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignKind {
    Campaign,
    Ngo,
}

/// Planned/actual use of raised funds, shown on the campaign page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundUtilizationLine {
    pub title: String,
    /// Whole-unit currency amount earmarked for this line.
    pub amount: u64,
    pub desc: String,
    pub status: String,
}

/// A progress update posted by the organizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    pub title: String,
    pub date: NaiveDate,
    pub content: String,
}

/// The editable fields of a campaign.
///
/// `Edit` is a full replace of this set; the id and the donation history are
/// untouched by edits, and the running total is derived elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFields {
    pub title: String,
    pub category: String,
    /// Ordered paragraphs describing the cause.
    pub about: Vec<String>,
    pub organizer: String,
    /// Hospital or care-center descriptor.
    pub hospital: String,
    pub kind: CampaignKind,
    /// Fundraising target, whole currency units.
    pub goal: u64,
    /// Visibility flag: inactive campaigns do not accept donations.
    pub is_active: bool,
    pub deadline: Option<NaiveDate>,
    pub fund_utilization: Vec<FundUtilizationLine>,
    pub updates: Vec<CampaignUpdate>,
}

impl Default for CampaignFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: String::new(),
            about: Vec::new(),
            organizer: String::new(),
            hospital: String::new(),
            kind: CampaignKind::Campaign,
            goal: 0,
            is_active: true,
            deadline: None,
            fund_utilization: Vec::new(),
            updates: Vec::new(),
        }
    }
}

impl CampaignFields {
    /// Intake validation shared by create and edit.
    fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.goal == 0 {
            return Err(DomainError::validation("goal must be a positive number"));
        }
        if self.about.is_empty() {
            return Err(DomainError::validation("about must not be empty"));
        }
        Ok(())
    }
}

/// Aggregate root: Campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    id: CampaignId,
    fields: CampaignFields,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Campaign {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CampaignId) -> Self {
        Self {
            id,
            fields: CampaignFields::default(),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> CampaignId {
        self.id
    }

    pub fn fields(&self) -> &CampaignFields {
        &self.fields
    }

    /// Whether the campaign exists from a caller's point of view.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Invariant helper: whether this campaign may accept donations.
    pub fn accepts_donations(&self) -> bool {
        self.exists() && self.fields.is_active
    }
}

impl AggregateRoot for Campaign {
    type Id = CampaignId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateCampaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub campaign_id: CampaignId,
    pub fields: CampaignFields,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCampaign (full replace of the editable fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCampaign {
    pub campaign_id: CampaignId,
    pub fields: CampaignFields,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteCampaign.
///
/// The cross-entity pending-donation guard lives in the ledger service; this
/// command only records the campaign-local fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCampaign {
    pub campaign_id: CampaignId,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignCommand {
    CreateCampaign(CreateCampaign),
    UpdateCampaign(UpdateCampaign),
    DeleteCampaign(DeleteCampaign),
}

/// Event: CampaignCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCreated {
    pub campaign_id: CampaignId,
    pub fields: CampaignFields,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CampaignUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdated {
    pub campaign_id: CampaignId,
    pub fields: CampaignFields,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CampaignDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDeleted {
    pub campaign_id: CampaignId,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignEvent {
    CampaignCreated(CampaignCreated),
    CampaignUpdated(CampaignUpdated),
    CampaignDeleted(CampaignDeleted),
}

impl Event for CampaignEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CampaignEvent::CampaignCreated(_) => "campaigns.campaign.created",
            CampaignEvent::CampaignUpdated(_) => "campaigns.campaign.updated",
            CampaignEvent::CampaignDeleted(_) => "campaigns.campaign.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CampaignEvent::CampaignCreated(e) => e.occurred_at,
            CampaignEvent::CampaignUpdated(e) => e.occurred_at,
            CampaignEvent::CampaignDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Campaign {
    type Command = CampaignCommand;
    type Event = CampaignEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CampaignEvent::CampaignCreated(e) => {
                self.id = e.campaign_id;
                self.fields = e.fields.clone();
                self.created = true;
                self.deleted = false;
            }
            CampaignEvent::CampaignUpdated(e) => {
                self.fields = e.fields.clone();
            }
            CampaignEvent::CampaignDeleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CampaignCommand::CreateCampaign(cmd) => self.handle_create(cmd),
            CampaignCommand::UpdateCampaign(cmd) => self.handle_update(cmd),
            CampaignCommand::DeleteCampaign(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Campaign {
    fn ensure_campaign_id(&self, campaign_id: CampaignId) -> Result<(), DomainError> {
        if self.id != campaign_id {
            return Err(DomainError::conflict("campaign_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateCampaign) -> Result<Vec<CampaignEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("campaign already exists"));
        }

        cmd.fields.validate()?;

        Ok(vec![CampaignEvent::CampaignCreated(CampaignCreated {
            campaign_id: cmd.campaign_id,
            fields: cmd.fields.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCampaign) -> Result<Vec<CampaignEvent>, DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        self.ensure_campaign_id(cmd.campaign_id)?;

        cmd.fields.validate()?;

        Ok(vec![CampaignEvent::CampaignUpdated(CampaignUpdated {
            campaign_id: cmd.campaign_id,
            fields: cmd.fields.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteCampaign) -> Result<Vec<CampaignEvent>, DomainError> {
        if !self.exists() {
            return Err(DomainError::not_found());
        }
        self.ensure_campaign_id(cmd.campaign_id)?;

        Ok(vec![CampaignEvent::CampaignDeleted(CampaignDeleted {
            campaign_id: cmd.campaign_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
