//! Durable storage boundary for learned provider facts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::ProviderProfile;
use crate::error::StoreError;

/// Narrow load/save surface the fingerprint ledger persists through.
///
/// Implementations must be safe to call from concurrent workers; failures are
/// reported, not raised into the request path.
pub trait FingerprintStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, ProviderProfile>, StoreError>;
    fn save(&self, profiles: &HashMap<String, ProviderProfile>) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FingerprintFile {
    #[serde(default)]
    providers: HashMap<String, ProviderProfile>,
}

/// File-backed store writing TOML, the same format the rest of the
/// configuration uses.
pub struct TomlFingerprintStore {
    path: PathBuf,
}

impl TomlFingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FingerprintStore for TomlFingerprintStore {
    fn load(&self) -> Result<HashMap<String, ProviderProfile>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let s = std::fs::read_to_string(&self.path)?;
        let file: FingerprintFile = toml::from_str(&s)?;
        Ok(file.providers)
    }

    fn save(&self, profiles: &HashMap<String, ProviderProfile>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = FingerprintFile {
            providers: profiles.clone(),
        };
        let s = toml::to_string_pretty(&file)?;
        std::fs::write(&self.path, s)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, ProviderProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved profiles, for assertions.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FingerprintStore for MemoryStore {
    fn load(&self) -> Result<HashMap<String, ProviderProfile>, StoreError> {
        let g = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(g.clone())
    }

    fn save(&self, profiles: &HashMap<String, ProviderProfile>) -> Result<(), StoreError> {
        let mut g = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *g = profiles.clone();
        Ok(())
    }
}
