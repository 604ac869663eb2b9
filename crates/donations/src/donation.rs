use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carefund_auth::ActorId;
use carefund_campaigns::CampaignId;
use carefund_core::{Aggregate, AggregateId, AggregateRoot, Amount, DomainError};
use carefund_events::Event;

/// Donation identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub AggregateId);

impl DonationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DonationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Donation state machine. `Pending` is the only initial state; both
/// transitions out of it are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationState {
    Pending,
    Approved,
    Rejected,
}

impl core::fmt::Display for DonationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            DonationState::Pending => "pending",
            DonationState::Approved => "approved",
            DonationState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Who donated: an authenticated user or an explicit anonymous marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum DonorRef {
    User(ActorId),
    Anonymous,
}

/// Display metadata captured at submission. Never used in financial logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorDetails {
    pub email: Option<String>,
    pub card_name: Option<String>,
}

/// Aggregate root: Donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donation {
    id: DonationId,
    campaign_id: Option<CampaignId>,
    amount: Option<Amount>,
    donor: Option<DonorRef>,
    details: DonorDetails,
    submitted_at: Option<DateTime<Utc>>,
    state: DonationState,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<ActorId>,
    reject_reason: Option<String>,
    version: u64,
    created: bool,
}

impl Donation {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: DonationId) -> Self {
        Self {
            id,
            campaign_id: None,
            amount: None,
            donor: None,
            details: DonorDetails::default(),
            submitted_at: None,
            state: DonationState::Pending,
            decided_at: None,
            decided_by: None,
            reject_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DonationId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn campaign_id(&self) -> Option<CampaignId> {
        self.campaign_id
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn donor(&self) -> Option<DonorRef> {
        self.donor
    }

    pub fn details(&self) -> &DonorDetails {
        &self.details
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn state(&self) -> DonationState {
        self.state
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn decided_by(&self) -> Option<ActorId> {
        self.decided_by
    }

    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.created && self.state == DonationState::Pending
    }
}

impl AggregateRoot for Donation {
    type Id = DonationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitDonation.
///
/// Payment completion is an opaque precondition satisfied upstream; by the
/// time this command exists, the money question is someone else's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDonation {
    pub donation_id: DonationId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub donor: DonorRef,
    pub details: DonorDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveDonation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveDonation {
    pub donation_id: DonationId,
    pub decided_by: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectDonation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectDonation {
    pub donation_id: DonationId,
    pub decided_by: ActorId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationCommand {
    SubmitDonation(SubmitDonation),
    ApproveDonation(ApproveDonation),
    RejectDonation(RejectDonation),
}

/// Event: DonationSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationSubmitted {
    pub donation_id: DonationId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub donor: DonorRef,
    pub details: DonorDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DonationApproved.
///
/// Carries the campaign id and amount so downstream consumers fold the
/// running total without loading the donation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationApproved {
    pub donation_id: DonationId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub decided_by: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DonationRejected.
///
/// Carries the amount for the same reason as `DonationApproved`: downstream
/// pending-money tallies fold without loading the donation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRejected {
    pub donation_id: DonationId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub reason: Option<String>,
    pub decided_by: ActorId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationEvent {
    DonationSubmitted(DonationSubmitted),
    DonationApproved(DonationApproved),
    DonationRejected(DonationRejected),
}

impl Event for DonationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DonationEvent::DonationSubmitted(_) => "donations.donation.submitted",
            DonationEvent::DonationApproved(_) => "donations.donation.approved",
            DonationEvent::DonationRejected(_) => "donations.donation.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DonationEvent::DonationSubmitted(e) => e.occurred_at,
            DonationEvent::DonationApproved(e) => e.occurred_at,
            DonationEvent::DonationRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Donation {
    type Command = DonationCommand;
    type Event = DonationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DonationEvent::DonationSubmitted(e) => {
                self.id = e.donation_id;
                self.campaign_id = Some(e.campaign_id);
                self.amount = Some(e.amount);
                self.donor = Some(e.donor);
                self.details = e.details.clone();
                self.submitted_at = Some(e.occurred_at);
                self.state = DonationState::Pending;
                self.created = true;
            }
            DonationEvent::DonationApproved(e) => {
                self.state = DonationState::Approved;
                self.decided_at = Some(e.occurred_at);
                self.decided_by = Some(e.decided_by);
            }
            DonationEvent::DonationRejected(e) => {
                self.state = DonationState::Rejected;
                self.decided_at = Some(e.occurred_at);
                self.decided_by = Some(e.decided_by);
                self.reject_reason = e.reason.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DonationCommand::SubmitDonation(cmd) => self.handle_submit(cmd),
            DonationCommand::ApproveDonation(cmd) => self.handle_approve(cmd),
            DonationCommand::RejectDonation(cmd) => self.handle_reject(cmd),
        }
    }
}

impl Donation {
    fn ensure_donation_id(&self, donation_id: DonationId) -> Result<(), DomainError> {
        if self.id != donation_id {
            return Err(DomainError::conflict("donation_id mismatch"));
        }
        Ok(())
    }

    /// State-machine guard shared by both decisions.
    ///
    /// Returns the campaign id and amount captured at submission, so decision
    /// events carry everything downstream consumers need.
    fn ensure_pending(&self) -> Result<(CampaignId, Amount), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.state != DonationState::Pending {
            return Err(DomainError::invalid_state(format!(
                "donation is already {}",
                self.state
            )));
        }
        match (self.campaign_id, self.amount) {
            (Some(campaign_id), Some(amount)) => Ok((campaign_id, amount)),
            // Unreachable for a created donation; kept as a guard against
            // corrupt streams.
            _ => Err(DomainError::invalid_state("donation has no submission data")),
        }
    }

    fn handle_submit(&self, cmd: &SubmitDonation) -> Result<Vec<DonationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("donation already exists"));
        }

        Ok(vec![DonationEvent::DonationSubmitted(DonationSubmitted {
            donation_id: cmd.donation_id,
            campaign_id: cmd.campaign_id,
            amount: cmd.amount,
            donor: cmd.donor,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveDonation) -> Result<Vec<DonationEvent>, DomainError> {
        self.ensure_donation_id(cmd.donation_id)?;
        let (campaign_id, amount) = self.ensure_pending()?;

        Ok(vec![DonationEvent::DonationApproved(DonationApproved {
            donation_id: cmd.donation_id,
            campaign_id,
            amount,
            decided_by: cmd.decided_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectDonation) -> Result<Vec<DonationEvent>, DomainError> {
        self.ensure_donation_id(cmd.donation_id)?;
        let (campaign_id, amount) = self.ensure_pending()?;

        Ok(vec![DonationEvent::DonationRejected(DonationRejected {
            donation_id: cmd.donation_id,
            campaign_id,
            amount,
            reason: cmd.reason.clone(),
            decided_by: cmd.decided_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carefund_core::AggregateId;

    fn test_donation_id() -> DonationId {
        DonationId::new(AggregateId::new())
    }

    fn test_campaign_id() -> CampaignId {
        CampaignId::new(AggregateId::new())
    }

    fn test_admin() -> ActorId {
        ActorId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn submitted_donation(amount: u64) -> Donation {
        let id = test_donation_id();
        let mut donation = Donation::empty(id);
        let events = donation
            .handle(&DonationCommand::SubmitDonation(SubmitDonation {
                donation_id: id,
                campaign_id: test_campaign_id(),
                amount: Amount::new(amount).unwrap(),
                donor: DonorRef::Anonymous,
                details: DonorDetails::default(),
                occurred_at: test_time(),
            }))
            .unwrap();
        donation.apply(&events[0]);
        donation
    }

    #[test]
    fn submit_creates_pending_donation() {
        let donation = submitted_donation(5000);
        assert_eq!(donation.state(), DonationState::Pending);
        assert!(donation.is_pending());
        assert_eq!(donation.amount().unwrap().get(), 5000);
        assert!(donation.decided_by().is_none());
    }

    #[test]
    fn approve_transitions_pending_to_approved() {
        let mut donation = submitted_donation(5000);
        let admin = test_admin();

        let events = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: admin,
                occurred_at: test_time(),
            }))
            .unwrap();

        match &events[0] {
            DonationEvent::DonationApproved(e) => {
                assert_eq!(e.amount.get(), 5000);
                assert_eq!(e.campaign_id, donation.campaign_id().unwrap());
                assert_eq!(e.decided_by, admin);
            }
            _ => panic!("Expected DonationApproved event"),
        }

        donation.apply(&events[0]);
        assert_eq!(donation.state(), DonationState::Approved);
        assert_eq!(donation.decided_by(), Some(admin));
        assert!(donation.decided_at().is_some());
    }

    #[test]
    fn reject_transitions_pending_to_rejected() {
        let mut donation = submitted_donation(100);
        let admin = test_admin();

        let events = donation
            .handle(&DonationCommand::RejectDonation(RejectDonation {
                donation_id: donation.id_typed(),
                decided_by: admin,
                reason: Some("card declined upstream".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();
        donation.apply(&events[0]);

        assert_eq!(donation.state(), DonationState::Rejected);
        assert_eq!(donation.reject_reason(), Some("card declined upstream"));
    }

    #[test]
    fn approve_of_approved_donation_is_invalid_state() {
        let mut donation = submitted_donation(5000);
        let events = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                occurred_at: test_time(),
            }))
            .unwrap();
        donation.apply(&events[0]);

        let before = donation.clone();
        let err = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                occurred_at: test_time(),
            }))
            .unwrap_err();

        match err {
            DomainError::InvalidState(msg) => assert!(msg.contains("approved")),
            other => panic!("Expected InvalidState, got {other:?}"),
        }
        assert_eq!(donation, before);
    }

    #[test]
    fn reject_of_approved_donation_is_invalid_state() {
        let mut donation = submitted_donation(5000);
        let events = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                occurred_at: test_time(),
            }))
            .unwrap();
        donation.apply(&events[0]);

        let err = donation
            .handle(&DonationCommand::RejectDonation(RejectDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn decision_on_unknown_donation_is_not_found() {
        let donation = Donation::empty(test_donation_id());

        let err = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let donation = submitted_donation(1234);
        let before = donation.clone();

        let _ = donation
            .handle(&DonationCommand::ApproveDonation(ApproveDonation {
                donation_id: donation.id_typed(),
                decided_by: test_admin(),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(donation, before);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Decision {
            Approve,
            Reject,
        }

        fn decision() -> impl Strategy<Value = Decision> {
            prop_oneof![Just(Decision::Approve), Just(Decision::Reject)]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: the first decision wins; every later decision fails
            /// with InvalidState and leaves the donation untouched.
            #[test]
            fn decisions_are_terminal(
                amount in 1u64..1_000_000,
                first in decision(),
                later in proptest::collection::vec(decision(), 1..8),
            ) {
                let mut donation = submitted_donation(amount);
                let donation_id = donation.id_typed();
                let admin = test_admin();

                let cmd = move |d: &Decision| match d {
                    Decision::Approve => DonationCommand::ApproveDonation(ApproveDonation {
                        donation_id,
                        decided_by: admin,
                        occurred_at: test_time(),
                    }),
                    Decision::Reject => DonationCommand::RejectDonation(RejectDonation {
                        donation_id,
                        decided_by: admin,
                        reason: None,
                        occurred_at: test_time(),
                    }),
                };

                let events = donation.handle(&cmd(&first)).unwrap();
                donation.apply(&events[0]);
                let settled = donation.clone();

                for d in &later {
                    let err = donation.handle(&cmd(d)).unwrap_err();
                    prop_assert!(matches!(err, DomainError::InvalidState(_)));
                    prop_assert_eq!(&donation, &settled);
                }
            }
        }
    }
}
