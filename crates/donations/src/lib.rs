//! Donations domain module (event-sourced).
//!
//! This crate contains business rules for donation intake and the approval
//! state machine, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage).
//!
//! A donation starts `pending` and is decided exactly once: approved or
//! rejected. Both transitions are terminal; corrections require a new
//! compensating donation, never mutation of history.

pub mod donation;

pub use donation::{
    ApproveDonation, Donation, DonationApproved, DonationCommand, DonationEvent, DonationId,
    DonationRejected, DonationState, DonationSubmitted, DonorDetails, DonorRef, RejectDonation,
    SubmitDonation,
};
