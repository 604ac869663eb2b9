//! HTTP API: server, routing, and request/response mapping.
//!
//! This is one binding of the ledger's operation table; the contract itself
//! lives in `carefund_infra::LedgerService`. Authentication is out of scope
//! for the ledger - requests arrive with a pre-authenticated actor identity
//! in trusted headers (see `context`).

pub mod app;
pub mod context;
