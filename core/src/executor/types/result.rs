use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::buffer::{BufferStats, ByteSized};

/// Result of executing a single task. Created exactly once, by the worker
/// that ran the task, and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,

    pub success: bool,

    /// Number of work items the task carried.
    pub row_count: usize,

    pub prompt_tokens: u64,
    pub completion_tokens: u64,

    /// Empty on success.
    pub error_message: String,

    /// item_index -> produced text.
    pub translated_items: HashMap<u32, String>,
}

impl TaskOutcome {
    pub fn failure(task_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            row_count: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            error_message: error_message.into(),
            translated_items: HashMap::new(),
        }
    }

    pub fn cancelled(task_id: impl Into<String>) -> Self {
        Self::failure(task_id, "Task cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        !self.success && self.error_message == "Task cancelled"
    }
}

impl ByteSized for TaskOutcome {
    fn byte_len(&self) -> usize {
        self.translated_items.values().map(|t| t.len()).sum()
    }
}

/// Aggregate statistics for one batch run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// True when the run ended because `request_stop()` was called, as
    /// opposed to running every task to a terminal state on its own.
    pub stopped: bool,
    pub duration_ms: u64,
    pub buffer: BufferStats,
}
