//! Concurrent Batch Dispatch Engine
//!
//! This module drives a batch of provider-bound tasks through a bounded
//! permit pool. It supports:
//! - Bounded fan-out with a hard concurrency ceiling
//! - Cooperative pause/resume/stop via the signal hub
//! - Learned cache downgrades via the provider fingerprint ledger
//! - Input-ordered outcome aggregation regardless of completion order
//! - Per-task and progress callbacks with panic containment
//!
//! # Architecture
//!
//! ```text
//! Vec<TaskDescriptor>
//!   ↓
//! TaskExecutor::run()
//!   ↓
//! SignalHub::set_concurrency() + ResultBuffer::prepare()
//!   ↓
//! FuturesUnordered { stop check → pause gate → permit → adapter call }
//!   ↓
//! ResultBuffer (write-once slots) → Vec<TaskOutcome> in input order
//! ```

mod engine;
mod progress;
pub mod traits;
pub mod types;

pub use engine::{TaskExecutor, TaskExecutorBuilder};
pub use progress::ProgressMonitor;
pub use traits::{AdapterReply, ProgressCallback, ProviderAdapter, RetryStrategy, TaskCallback};
pub use types::{
    ChatMessage, ExecutionReport, ExecutorConfig, PlatformConfig, TaskDescriptor, TaskOutcome,
    WorkItem, MAX_CONCURRENCY_CEILING,
};
