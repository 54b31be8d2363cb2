//! lingo-core: concurrent bulk dispatch engine for LLM translation batches.
//!
//! The crate is organized around five collaborators:
//! - [`classifier`]: stateless error taxonomy (hard / soft / cache-related)
//! - [`fingerprint`]: persistent per-provider capability ledger
//! - [`signal`]: pause/resume/stop coordination and the concurrency permit pool
//! - [`buffer`]: pre-allocated, write-once result aggregation
//! - [`executor`]: the batch dispatcher tying them together behind a
//!   caller-supplied provider adapter

pub mod buffer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod logging;
pub mod signal;

pub use buffer::{BufferStats, IndexedResultBuffer, ResultBuffer};
pub use error::{ExecutorError, StoreError};
pub use executor::{
    AdapterReply, ExecutionReport, ProviderAdapter, RetryStrategy, TaskDescriptor, TaskExecutor,
    TaskOutcome,
};
pub use fingerprint::ProviderFingerprint;
pub use signal::{Signal, SignalHub, SignalType};
