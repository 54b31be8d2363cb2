//! Config-driven construction of boundary implementations.

use std::sync::Arc;

use anyhow::Result;

use lingo_core::config::{FingerprintConfig, RetryConfig};
use lingo_core::executor::RetryStrategy;
use lingo_core::fingerprint::TomlFingerprintStore;
use lingo_core::ProviderFingerprint;

use crate::adapter::ReplayAdapter;
use crate::strategies::{ExponentialBackoff, LinearBackoff};

pub fn build_retry_strategy(cfg: &RetryConfig) -> Arc<dyn RetryStrategy> {
    match cfg.strategy.as_str() {
        "linear" => Arc::new(LinearBackoff::new(cfg.clone())),
        // Preserve existing behavior: anything other than linear backs off
        // exponentially.
        _ => Arc::new(ExponentialBackoff::new(cfg.clone())),
    }
}

pub fn build_fingerprint(cfg: &FingerprintConfig) -> Arc<ProviderFingerprint> {
    match &cfg.path {
        Some(path) => Arc::new(ProviderFingerprint::new(Arc::new(
            TomlFingerprintStore::new(path),
        ))),
        None => Arc::new(ProviderFingerprint::in_memory()),
    }
}

pub fn build_replay_adapter(events_file: &str) -> Result<Arc<ReplayAdapter>> {
    Ok(Arc::new(ReplayAdapter::from_file(events_file)?))
}
