mod config;
mod result;
mod task;

pub use config::{ExecutorConfig, MAX_CONCURRENCY_CEILING};
pub use result::{ExecutionReport, TaskOutcome};
pub use task::{ChatMessage, PlatformConfig, TaskDescriptor, WorkItem};
