// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Longest cache TTL accepted from config or environment.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rate_api_url: String,
    pub rate_api_key: Option<String>,
    pub database_url: String,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// Preference file location; confy's per-user path when unset.
    pub preferences_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_api_url: "https://api.frankfurter.app".to_string(),
            rate_api_key: None,
            database_url: "sqlite://kurzora.db".to_string(),
            cache_ttl_secs: 3600,
            request_timeout_secs: 10,
            preferences_path: None,
        }
    }
}

impl Config {
    /// Cache TTL as a chrono duration; errors above `MAX_CACHE_TTL_SECS`.
    pub fn cache_ttl(&self) -> anyhow::Result<chrono::Duration> {
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            anyhow::bail!(
                "cache_ttl_secs out of range: {} (max {})",
                self.cache_ttl_secs,
                MAX_CACHE_TTL_SECS
            );
        }
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("cache_ttl_secs out of range: {}", self.cache_ttl_secs))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `KURZORA_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(url) = env::var("KURZORA_RATE_API_URL") {
            self.rate_api_url = url;
        }
        if let Ok(key) = env::var("KURZORA_RATE_API_KEY") {
            self.rate_api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Ok(url) = env::var("KURZORA_DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(ttl) = env::var("KURZORA_CACHE_TTL_SECS") {
            self.cache_ttl_secs = ttl
                .parse()
                .with_context(|| format!("KURZORA_CACHE_TTL_SECS is not a number: {}", ttl))?;
            self.cache_ttl()?;
        }
        Ok(())
    }
}

fn get_config_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.toml");
    path
}

/// Load the config from an explicit path, or `config.toml` in the crate root.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if !config_path.exists() {
        log::debug!("No config at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    config.cache_ttl()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = load_config(Some(&dir.path().join("nope.toml")))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_ttl()?, chrono::Duration::hours(1));
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "cache_ttl_secs = 60\nrate_api_url = \"http://localhost:9999\"\n")?;

        let config = load_config(Some(&path))?;
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.rate_api_url, "http://localhost:9999");
        assert_eq!(config.database_url, "sqlite://kurzora.db");
        Ok(())
    }

    #[test]
    fn test_oversized_ttl_is_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "cache_ttl_secs = 1000000000000000\n")?;
        assert!(load_config(Some(&path)).is_err());

        let config = Config {
            cache_ttl_secs: MAX_CACHE_TTL_SECS + 1,
            ..Config::default()
        };
        assert!(config.cache_ttl().is_err());

        // Wraps when cast to i64
        let config = Config {
            cache_ttl_secs: u64::MAX,
            ..Config::default()
        };
        assert!(config.cache_ttl().is_err());

        let config = Config {
            cache_ttl_secs: 86_400,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl()?, chrono::Duration::days(1));
        Ok(())
    }

    #[test]
    fn test_env_ttl_override_is_range_checked() {
        env::set_var("KURZORA_CACHE_TTL_SECS", "18446744073709551615");
        let mut config = Config::default();
        let result = config.apply_env_overrides();
        env::remove_var("KURZORA_CACHE_TTL_SECS");
        assert!(result.is_err());
    }
}
