use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default lingo data directory: ~/.lingo
pub fn get_lingo_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".lingo"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.lingo/config.toml (highest)
    let lingo_dir = get_lingo_data_dir()?;
    let lingo_config = lingo_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if lingo_config.exists() {
        let s = std::fs::read_to_string(&lingo_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    // Default the fingerprint ledger into the lingo data directory
    if cfg.fingerprint.path.is_none() {
        std::fs::create_dir_all(&lingo_dir)?;
        cfg.fingerprint.path = Some(
            lingo_dir
                .join("fingerprints.toml")
                .to_string_lossy()
                .to_string(),
        );
    }

    // Update logging directory to use lingo data directory if not set
    if cfg.logging.directory.is_none()
        || cfg
            .logging
            .directory
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(false)
    {
        let logs_dir = lingo_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (Priority 0: highest)
    if let Ok(v) = std::env::var("LINGO_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
    if let Ok(v) = std::env::var("LINGO_MAX_CONCURRENCY") {
        if let Ok(n) = v.trim().parse::<usize>() {
            cfg.executor.max_concurrency = n;
        }
    }

    Ok(cfg)
}
