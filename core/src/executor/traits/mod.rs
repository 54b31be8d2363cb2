//! Boundary seams between the engine and its external collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{ChatMessage, PlatformConfig, TaskOutcome};
use crate::classifier;

/// What an adapter hands back for one request.
///
/// Adapters convert every protocol fault into this shape; nothing they do is
/// allowed to propagate as a panic or error into the engine, since one task's
/// fault must not destabilize the batch.
#[derive(Debug, Clone)]
pub struct AdapterReply {
    pub failed: bool,
    /// Model reasoning text on success; a coarse failure kind on failure.
    pub think: String,
    /// Produced text on success; the raw error message on failure.
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl AdapterReply {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            failed: false,
            think: String::new(),
            content: content.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    pub fn failure(kind: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            failed: true,
            think: kind.into(),
            content: error_message.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    pub fn with_tokens(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self
    }
}

/// Per-backend wire client. Owns protocol shaping, request timeouts, the
/// shared connection pool and its own streaming-support ledger; the engine
/// only sees the reply shape above.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        platform: &PlatformConfig,
    ) -> AdapterReply;

    /// Close the shared connection pool. Called exactly once, after the full
    /// batch completes, never mid-batch.
    async fn shutdown(&self) {}
}

/// Backoff policy for callers that re-submit retry-eligible failures.
///
/// Eligibility itself is the classifier's call; strategies only shape the
/// delay curve.
pub trait RetryStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Delay before the given attempt, or `None` to give up.
    fn next_delay(&self, attempt: u32, error: &str) -> Option<Duration>;

    fn max_attempts(&self) -> u32;

    fn should_retry(&self, attempt: u32, error: &str) -> bool {
        attempt < self.max_attempts() && classifier::should_retry(error)
    }
}

/// Fired once per task, from whichever worker finished it. Must be
/// internally thread-safe; panics are contained and logged.
pub type TaskCallback = Arc<dyn Fn(&TaskOutcome) + Send + Sync>;

/// Fired as `(done, total)` after every task reaches a terminal state.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;
