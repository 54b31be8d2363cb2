use serde::{Deserialize, Serialize};

/// Hard ceiling on concurrent in-flight requests, protecting both the local
/// process and remote providers no matter what the configuration asks for.
pub const MAX_CONCURRENCY_CEILING: usize = 500;

/// Executor tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Desired concurrent in-flight requests; clamped to
    /// `1..=MAX_CONCURRENCY_CEILING` at run start.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Render an indicatif progress bar while the batch runs.
    #[serde(default)]
    pub progress_bar: bool,
}

fn default_max_concurrency() -> usize {
    100
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            progress_bar: false,
        }
    }
}

impl ExecutorConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_CONCURRENCY_CEILING)
    }
}
