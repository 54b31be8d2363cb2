//! Control-signal hub shared by all concurrent workers.
//!
//! Broadcasts pause/resume/stop and capability-downgrade signals, keeps a
//! bounded history for diagnostics, and owns the concurrency permit pool
//! every worker acquires from before touching the network.

mod hub;
mod types;

pub use hub::{SignalHub, SlotPermit, SubscriptionId};
pub use types::{Signal, SignalType};
