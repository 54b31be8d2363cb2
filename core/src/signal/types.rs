//! Signal type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Control signals broadcast between concurrent workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Suspend all workers at their next safe point.
    Pause,
    /// Wake workers blocked on the pause condition.
    Resume,
    /// Stop the batch; cooperative, in-flight calls finish.
    Stop,
    /// Stop sending cache directives batch-wide.
    DisableCache,
    /// A provider endpoint was swapped mid-run.
    SwitchApi,
    /// A worker hit rate limiting; peers may self-throttle.
    RateLimitHit,
}

/// One emitted signal, retained in the hub's bounded history.
///
/// Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub timestamp: DateTime<Utc>,
    /// Free-form payload; shape depends on the signal type.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Who emitted it, when known (e.g. a provider URL).
    #[serde(default)]
    pub source: Option<String>,
}

impl Signal {
    pub fn new(signal_type: SignalType) -> Self {
        Self {
            signal_type,
            timestamp: Utc::now(),
            payload: serde_json::Value::Null,
            source: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
