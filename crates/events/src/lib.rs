//! Event plumbing: the `Event` contract, stream envelopes, and pub/sub.
//!
//! Events are the ledger's source of record - every campaign mutation and
//! every donation decision is an immutable fact appended to a stream and
//! distributed to read-model projections.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
