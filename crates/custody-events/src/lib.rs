//! Event fan-out for the custody ledger.
//!
//! Every successful ledger operation publishes exactly one [`LedgerEvent`].
//! The [`EventBus`] stamps it with a sequence number and an integrity hash,
//! keeps a bounded in-memory history, and delivers it to filtered
//! subscribers. Watching and relaying events out of process is left to the
//! host.

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{BusConfig, EventBus, EventFilter, EventStream};
pub use error::EventError;
pub use event::{EventId, EventKind, EventRecord, LedgerEvent};
