//! Integration tests for the full ledger pipeline.
//!
//! Tests: LedgerService → CommandDispatcher → EventStore → projections
//!
//! Verifies the externally observable guarantees:
//! - `raised` always equals the sum of approved donation amounts
//! - donation decisions are terminal and exactly one concurrent decider wins
//! - concurrent approvals of distinct donations lose no increments
//! - deletion hard-blocks on pending money unless cascade is requested

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carefund_auth::{Actor, ActorId, Role, VerificationStatus};
    use carefund_campaigns::CampaignId;
    use carefund_core::{AggregateId, ExpectedVersion};
    use carefund_donations::{DonationState, DonorDetails, DonorRef};

    use crate::event_store::{EventStore, EventStoreError, InMemoryEventStore, UncommittedEvent};
    use crate::service::{CampaignDraft, CampaignFilter, DonationFilter, LedgerError, LedgerService};

    fn admin() -> Actor {
        Actor::new(ActorId::new(), Role::admin(), VerificationStatus::Verified)
    }

    fn unverified_admin() -> Actor {
        Actor::new(ActorId::new(), Role::admin(), VerificationStatus::Pending)
    }

    fn donor() -> Actor {
        Actor::new(ActorId::new(), Role::donor(), VerificationStatus::Verified)
    }

    fn draft(title: &str, goal: u64) -> CampaignDraft {
        CampaignDraft {
            title: title.to_string(),
            category: "medical".to_string(),
            about: vec!["Why this campaign exists.".to_string()],
            organizer: "City Relief".to_string(),
            hospital: "St. Anne Children's Hospital".to_string(),
            kind: carefund_campaigns::CampaignKind::Campaign,
            goal,
            is_active: true,
            deadline: None,
            fund_utilization: Vec::new(),
            updates: Vec::new(),
        }
    }

    fn service_with_campaign(goal: u64) -> (LedgerService, Actor, CampaignId) {
        let service = LedgerService::new();
        let actor = admin();
        let campaign = service
            .create_campaign(&actor, draft("Help rebuild the pediatric ward", goal))
            .unwrap();
        (service, actor, campaign.campaign_id)
    }

    #[test]
    fn submit_approve_reapprove_moves_raised_exactly_once() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let campaign = service.get_campaign(campaign_id).unwrap();
        assert_eq!(campaign.goal, 100_000);
        assert_eq!(campaign.raised, 0);

        let donation = service
            .submit_donation(
                &donor(),
                campaign_id,
                5000,
                DonorRef::Anonymous,
                DonorDetails::default(),
            )
            .unwrap();
        assert_eq!(donation.state, DonationState::Pending);

        // Pending money does not move the total.
        assert_eq!(service.get_campaign(campaign_id).unwrap().raised, 0);

        let (donation, campaign) = service.approve_donation(&admin, donation.donation_id).unwrap();
        assert_eq!(donation.state, DonationState::Approved);
        assert_eq!(donation.decided_by, Some(admin.id));
        assert_eq!(campaign.raised, 5000);

        // Re-approving the same donation is a guarded no-op.
        let err = service.approve_donation(&admin, donation.donation_id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert_eq!(service.get_campaign(campaign_id).unwrap().raised, 5000);
    }

    #[test]
    fn intake_validation() {
        let (service, _admin, campaign_id) = service_with_campaign(100_000);

        let err = service
            .submit_donation(&donor(), campaign_id, 0, DonorRef::Anonymous, DonorDetails::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = service
            .submit_donation(&donor(), campaign_id, -50, DonorRef::Anonymous, DonorDetails::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let unknown = CampaignId::new(AggregateId::new());
        let err = service
            .submit_donation(&donor(), unknown, 100, DonorRef::Anonymous, DonorDetails::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));

        assert_eq!(service.get_campaign(campaign_id).unwrap().raised, 0);
    }

    #[test]
    fn inactive_campaign_rejects_intake() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let mut fields = draft("Help rebuild the pediatric ward", 100_000);
        fields.is_active = false;
        service.update_campaign(&admin, campaign_id, fields).unwrap();

        let err = service
            .submit_donation(&donor(), campaign_id, 100, DonorRef::Anonymous, DonorDetails::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));
    }

    #[test]
    fn rejection_never_touches_totals() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let donation = service
            .submit_donation(&donor(), campaign_id, 700, DonorRef::User(donor().id), DonorDetails::default())
            .unwrap();

        let rejected = service
            .reject_donation(&admin, donation.donation_id, Some("duplicate".to_string()))
            .unwrap();
        assert_eq!(rejected.state, DonationState::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some("duplicate"));

        let campaign = service.get_campaign(campaign_id).unwrap();
        assert_eq!(campaign.raised, 0);
        assert_eq!(campaign.pending_amount, 0);
        assert_eq!(campaign.pending_count, 0);
    }

    #[test]
    fn delete_hard_blocks_on_pending_donations() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        service
            .submit_donation(&donor(), campaign_id, 100, DonorRef::Anonymous, DonorDetails::default())
            .unwrap();

        let err = service.delete_campaign(&admin, campaign_id, false).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        // The campaign and its pending queue are untouched.
        assert!(service.get_campaign(campaign_id).is_ok());
        assert_eq!(
            service
                .list_pending_donations(&DonationFilter { campaign_id: Some(campaign_id) })
                .len(),
            1
        );
    }

    #[test]
    fn cascade_delete_rejects_pending_and_leaves_no_dangling_references() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let mut donation_ids = Vec::new();
        for _ in 0..3 {
            let d = service
                .submit_donation(&donor(), campaign_id, 100, DonorRef::Anonymous, DonorDetails::default())
                .unwrap();
            donation_ids.push(d.donation_id);
        }

        service.delete_campaign(&admin, campaign_id, true).unwrap();

        assert!(matches!(service.get_campaign(campaign_id), Err(LedgerError::NotFound)));
        assert!(service
            .list_pending_donations(&DonationFilter { campaign_id: Some(campaign_id) })
            .is_empty());
        assert!(service.list_pending_donations(&DonationFilter::default()).is_empty());

        // Every cascade rejection is individually audited.
        for donation_id in donation_ids {
            let records = service.audit().for_entity(donation_id.0);
            assert!(records.iter().any(|r| {
                r.action == "donations.donation.rejected"
                    && r.details.get("cascade") == Some(&serde_json::json!(true))
            }));
        }
    }

    #[test]
    fn decisions_after_campaign_deletion() {
        // Approval re-validates campaign existence and conflicts once the
        // campaign is gone; rejection stays permitted but finds the donation
        // already settled by the cascade (the deletion policy guarantees no
        // donation stays pending against a deleted campaign).
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let donation = service
            .submit_donation(&donor(), campaign_id, 100, DonorRef::Anonymous, DonorDetails::default())
            .unwrap();

        let second = service
            .create_campaign(&admin, draft("Winter shelter supplies", 50_000))
            .unwrap();
        let stranded = service
            .submit_donation(&donor(), second.campaign_id, 250, DonorRef::Anonymous, DonorDetails::default())
            .unwrap();

        service.delete_campaign(&admin, second.campaign_id, true).unwrap();

        let err = service.approve_donation(&admin, stranded.donation_id).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        let err = service.reject_donation(&admin, stranded.donation_id, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));

        // Other campaigns are unaffected.
        let (approved, campaign) = service.approve_donation(&admin, donation.donation_id).unwrap();
        assert_eq!(approved.state, DonationState::Approved);
        assert_eq!(campaign.raised, 100);
    }

    #[test]
    fn eligibility_is_enforced() {
        let (service, _admin, campaign_id) = service_with_campaign(100_000);
        let donor = donor();

        let err = service
            .create_campaign(&donor, draft("Not allowed", 10))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        let err = service
            .create_campaign(&unverified_admin(), draft("Not verified", 10))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        let donation = service
            .submit_donation(&donor, campaign_id, 100, DonorRef::User(donor.id), DonorDetails::default())
            .unwrap();
        let err = service.approve_donation(&donor, donation.donation_id).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }

    #[test]
    fn list_campaigns_filters_by_visibility_and_title() {
        let service = LedgerService::new();
        let actor = admin();

        service.create_campaign(&actor, draft("Pediatric ward rebuild", 1000)).unwrap();
        let hidden = service
            .create_campaign(&actor, {
                let mut d = draft("Dialysis machines", 2000);
                d.is_active = false;
                d
            })
            .unwrap();
        service.create_campaign(&actor, draft("Mobile clinic fuel", 3000)).unwrap();

        let all = service.list_campaigns(&CampaignFilter::default());
        assert_eq!(all.len(), 3);

        let active = service.list_campaigns(&CampaignFilter {
            is_active: Some(true),
            title_contains: None,
        });
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|c| c.campaign_id != hidden.campaign_id));

        let matched = service.list_campaigns(&CampaignFilter {
            is_active: None,
            title_contains: Some("DIALYSIS".to_string()),
        });
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].campaign_id, hidden.campaign_id);
    }

    #[test]
    fn update_replaces_fields_but_never_raised() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        let donation = service
            .submit_donation(&donor(), campaign_id, 5000, DonorRef::Anonymous, DonorDetails::default())
            .unwrap();
        service.approve_donation(&admin, donation.donation_id).unwrap();

        let mut fields = draft("Help rebuild the pediatric ward - phase 2", 250_000);
        fields.category = "infrastructure".to_string();
        let updated = service.update_campaign(&admin, campaign_id, fields).unwrap();

        assert_eq!(updated.title, "Help rebuild the pediatric ward - phase 2");
        assert_eq!(updated.goal, 250_000);
        assert_eq!(updated.raised, 5000);

        // Update audit carries before/after snapshots.
        let records = service.audit().for_entity(campaign_id.0);
        let update_record = records
            .iter()
            .find(|r| r.action == "campaigns.campaign.updated")
            .unwrap();
        assert!(update_record.details.get("before").is_some());
        assert!(update_record.details.get("after").is_some());
    }

    #[test]
    fn concurrent_approvals_of_distinct_donations_lose_no_increments() {
        let (service, admin, campaign_id) = service_with_campaign(1_000_000);
        let service = Arc::new(service);

        const N: usize = 16;
        const AMOUNT: i64 = 250;

        let donation_ids: Vec<_> = (0..N)
            .map(|_| {
                service
                    .submit_donation(
                        &donor(),
                        campaign_id,
                        AMOUNT,
                        DonorRef::Anonymous,
                        DonorDetails::default(),
                    )
                    .unwrap()
                    .donation_id
            })
            .collect();

        let handles: Vec<_> = donation_ids
            .into_iter()
            .map(|donation_id| {
                let service = service.clone();
                let admin = admin.clone();
                std::thread::spawn(move || service.approve_donation(&admin, donation_id))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let campaign = service.get_campaign(campaign_id).unwrap();
        assert_eq!(campaign.raised, (N as u64) * (AMOUNT as u64));
        assert_eq!(campaign.pending_count, 0);
    }

    #[test]
    fn concurrent_decisions_of_one_donation_have_exactly_one_winner() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);
        let service = Arc::new(service);

        let donation_id = service
            .submit_donation(&donor(), campaign_id, 900, DonorRef::Anonymous, DonorDetails::default())
            .unwrap()
            .donation_id;

        let approver = {
            let service = service.clone();
            let admin = admin.clone();
            std::thread::spawn(move || service.approve_donation(&admin, donation_id).map(|_| ()))
        };
        let rejecter = {
            let service = service.clone();
            let admin = admin.clone();
            std::thread::spawn(move || service.reject_donation(&admin, donation_id, None).map(|_| ()))
        };

        let results = [approver.join().unwrap(), rejecter.join().unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);

        // The loser got a typed state-machine error, not a dropped mutation.
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(loser, Err(LedgerError::InvalidState(_))));

        // Whichever decision won, the total matches the settled state.
        let campaign = service.get_campaign(campaign_id).unwrap();
        let pending = service.list_pending_donations(&DonationFilter { campaign_id: Some(campaign_id) });
        assert!(pending.is_empty());
        assert!(campaign.raised == 0 || campaign.raised == 900);
    }

    #[test]
    fn rebuild_recomputes_the_same_totals() {
        let (service, admin, campaign_id) = service_with_campaign(100_000);

        for i in 1..=5 {
            let d = service
                .submit_donation(&donor(), campaign_id, i * 10, DonorRef::Anonymous, DonorDetails::default())
                .unwrap();
            if i % 2 == 1 {
                service.approve_donation(&admin, d.donation_id).unwrap();
            } else {
                service.reject_donation(&admin, d.donation_id, None).unwrap();
            }
        }

        let before = service.get_campaign(campaign_id).unwrap();
        service.rebuild_projections().unwrap();
        let after = service.get_campaign(campaign_id).unwrap();

        assert_eq!(before, after);
        assert_eq!(after.raised, 10 + 30 + 50);
    }

    #[test]
    fn event_store_detects_concurrent_appends() {
        use chrono::Utc;

        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event = carefund_campaigns::CampaignEvent::CampaignDeleted(
            carefund_campaigns::CampaignDeleted {
                campaign_id: CampaignId::new(aggregate_id),
                actor: ActorId::new(),
                occurred_at: Utc::now(),
            },
        );
        let make = || {
            UncommittedEvent::from_typed(
                aggregate_id,
                "campaigns.campaign",
                uuid::Uuid::now_v7(),
                &event,
            )
            .unwrap()
        };

        store.append(vec![make()], ExpectedVersion::Exact(0)).unwrap();

        // A second writer that observed version 0 must not win.
        let err = store.append(vec![make()], ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Submit { amount: i64 },
            Approve { index: usize },
            Reject { index: usize },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1i64..10_000).prop_map(|amount| Op::Submit { amount }),
                (0usize..32).prop_map(|index| Op::Approve { index }),
                (0usize..32).prop_map(|index| Op::Reject { index }),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: for any sequence of submit/approve/reject operations,
            /// at every observable point `raised` equals the sum of amounts
            /// over donations whose state is approved.
            #[test]
            fn raised_always_equals_sum_of_approved(ops in proptest::collection::vec(op(), 1..40)) {
                let (service, admin, campaign_id) = service_with_campaign(u64::MAX / 2);

                // Model: (donation_id, amount, approved?)
                let mut submitted: Vec<(carefund_donations::DonationId, u64, bool)> = Vec::new();
                let mut expected_raised: u64 = 0;

                for op in ops {
                    match op {
                        Op::Submit { amount } => {
                            let d = service
                                .submit_donation(
                                    &donor(),
                                    campaign_id,
                                    amount,
                                    DonorRef::Anonymous,
                                    DonorDetails::default(),
                                )
                                .unwrap();
                            submitted.push((d.donation_id, amount as u64, false));
                        }
                        Op::Approve { index } if !submitted.is_empty() => {
                            let (id, amount, _) = submitted[index % submitted.len()];
                            if let Ok((_, campaign)) = service.approve_donation(&admin, id) {
                                expected_raised += amount;
                                let entry = submitted.iter_mut().find(|(d, _, _)| *d == id).unwrap();
                                entry.2 = true;
                                prop_assert_eq!(campaign.raised, expected_raised);
                            }
                        }
                        Op::Reject { index } if !submitted.is_empty() => {
                            let (id, _, _) = submitted[index % submitted.len()];
                            let _ = service.reject_donation(&admin, id, None);
                        }
                        _ => {}
                    }

                    prop_assert_eq!(
                        service.get_campaign(campaign_id).unwrap().raised,
                        expected_raised
                    );
                }
            }
        }
    }
}
