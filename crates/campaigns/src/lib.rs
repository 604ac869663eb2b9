//! Campaigns domain module (event-sourced).
//!
//! This crate contains business rules for fundraising campaigns, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).
//!
//! A campaign's running total (`raised`) is deliberately **not** part of this
//! aggregate: it is derived downstream from approved donation events, so it
//! can never be written independently of a donation-state transition.

pub mod campaign;

pub use campaign::{
    Campaign, CampaignCommand, CampaignCreated, CampaignDeleted, CampaignEvent, CampaignFields,
    CampaignId, CampaignKind, CampaignUpdate, CampaignUpdated, CreateCampaign, DeleteCampaign,
    FundUtilizationLine, UpdateCampaign,
};
