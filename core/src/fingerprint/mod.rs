//! Provider capability fingerprints.
//!
//! Remembers, per provider host, which optional features (prompt caching,
//! per-model streaming) the provider actually supports. Learned once from an
//! observed failure, persisted, and consulted on every later call so the same
//! capability probe is not renegotiated run after run.

mod store;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier;

pub use store::{FingerprintStore, MemoryStore, TomlFingerprintStore};

/// Tri-state support status. `Unknown` means "try it once and remember".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSupport {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

/// Everything learned about one provider host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Last URL observed for this host, kept for humans reading the file.
    pub api_url: String,

    #[serde(default)]
    pub cache_support: FeatureSupport,

    /// Stream support is negotiated per model, not per host.
    #[serde(default)]
    pub stream_models: HashMap<String, FeatureSupport>,
}

/// Process-wide, thread-safe capability ledger keyed by provider host.
///
/// Explicitly constructed and shared via `Arc`; one instance serves all
/// concurrent workers of a batch. Every mutation persists synchronously so a
/// crash right after learning a fact does not lose it. Persistence failures
/// are logged and swallowed: fingerprint learning is an optimization, never a
/// reason to fail the caller's request.
pub struct ProviderFingerprint {
    profiles: Mutex<HashMap<String, ProviderProfile>>,
    store: Arc<dyn FingerprintStore>,
}

impl ProviderFingerprint {
    /// Load the ledger from the store. A load failure starts empty.
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        let profiles = match store.load() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Failed to load provider fingerprints: {e}");
                HashMap::new()
            }
        };
        Self {
            profiles: Mutex::new(profiles),
            store,
        }
    }

    /// Ephemeral ledger backed by an in-memory store. Nothing survives the
    /// process; useful when no fingerprint path is configured.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Stable key for a provider: hash of the URL's authority component, so
    /// path or query differences on the same host share one fingerprint.
    pub fn provider_key(api_url: &str) -> String {
        let host = host_of(api_url);
        let digest = Sha256::digest(host.as_bytes());
        let mut key = String::with_capacity(12);
        for b in digest.iter().take(6) {
            key.push_str(&format!("{b:02x}"));
        }
        key
    }

    pub fn get_cache_support(&self, api_url: &str) -> FeatureSupport {
        let key = Self::provider_key(api_url);
        self.lock()
            .get(&key)
            .map(|p| p.cache_support)
            .unwrap_or_default()
    }

    pub fn set_cache_support(&self, api_url: &str, supported: bool) {
        let key = Self::provider_key(api_url);
        {
            let mut g = self.lock();
            let profile = g.entry(key).or_insert_with(|| ProviderProfile {
                api_url: api_url.to_string(),
                ..Default::default()
            });
            profile.cache_support = if supported {
                FeatureSupport::Supported
            } else {
                FeatureSupport::Unsupported
            };
        }
        self.persist();
    }

    pub fn get_stream_support(&self, api_url: &str, model: &str) -> FeatureSupport {
        let key = Self::provider_key(api_url);
        self.lock()
            .get(&key)
            .and_then(|p| p.stream_models.get(model).copied())
            .unwrap_or_default()
    }

    pub fn set_stream_support(&self, api_url: &str, model: &str, supported: bool) {
        let key = Self::provider_key(api_url);
        {
            let mut g = self.lock();
            let profile = g.entry(key).or_insert_with(|| ProviderProfile {
                api_url: api_url.to_string(),
                ..Default::default()
            });
            let status = if supported {
                FeatureSupport::Supported
            } else {
                FeatureSupport::Unsupported
            };
            profile.stream_models.insert(model.to_string(), status);
        }
        self.persist();
    }

    /// Whether the next request to this provider should attempt caching.
    /// `Unknown` defaults to yes; only an explicit `Unsupported` says no.
    pub fn should_use_cache(&self, api_url: &str) -> bool {
        self.get_cache_support(api_url) != FeatureSupport::Unsupported
    }

    /// Downgrade the cache feature for this provider, but only when the
    /// error text is actually cache-specific. A transient soft error passed
    /// in here must leave the fingerprint untouched.
    pub fn mark_cache_unsupported(&self, api_url: &str, error_message: &str) {
        if !classifier::is_cache_related(error_message) {
            return;
        }
        self.set_cache_support(api_url, false);
        tracing::info!("Provider fingerprint updated: cache disabled for {api_url}");
    }

    /// Full profile snapshot for one provider, if any.
    pub fn summary(&self, api_url: &str) -> Option<ProviderProfile> {
        let key = Self::provider_key(api_url);
        self.lock().get(&key).cloned()
    }

    /// Drop the fingerprint for one provider (external reset).
    pub fn clear(&self, api_url: &str) {
        let key = Self::provider_key(api_url);
        let removed = self.lock().remove(&key).is_some();
        if removed {
            self.persist();
        }
    }

    pub fn clear_all(&self) {
        self.lock().clear();
        self.persist();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProviderProfile>> {
        match self.profiles.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self) {
        let snapshot = self.lock().clone();
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("Failed to save provider fingerprints: {e}");
        }
    }
}

/// Authority component of a URL-ish string: strips the scheme, then cuts at
/// the first path/query/fragment separator.
fn host_of(api_url: &str) -> &str {
    let rest = match api_url.find("://") {
        Some(i) => &api_url[i + 3..],
        None => api_url,
    };
    let end = rest
        .find(['/', '?', '#'])
        .unwrap_or(rest.len());
    &rest[..end]
}
