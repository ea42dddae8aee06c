//! # Configuration
//!
//! `GuardConfig` is read from a camelCase JSON file and then patched from
//! `NAVGUARD_*` environment variables. Every field has a default, so an
//! empty object (or no file at all) is a valid configuration.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const DATABASE_FILE: &str = "navguard.db";

/// Upper bound for `cacheTtlSecs` (one week).
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 86_400;
/// Upper bound for `allowlistTtlSecs` (ten years); leave it unset for "forever".
pub const MAX_ALLOWLIST_TTL_SECS: u64 = 10 * 365 * 86_400;

const ENV_API_URL: &str = "NAVGUARD_API_URL";
const ENV_DATA_DIR: &str = "NAVGUARD_DATA_DIR";
const ENV_LOG: &str = "NAVGUARD_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardConfig {
    /// Base URL of the reputation service; `/scan`, `/report` and `/health`
    /// are appended.
    pub api_url: String,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// `0` leaves the scan request without a timeout.
    pub scan_timeout_ms: u64,
    /// How long a command sent to the browser may wait for its ack.
    pub host_call_timeout_ms: u64,
    /// `None` keeps allowlist overrides forever.
    pub allowlist_ttl_secs: Option<u64>,
    pub internal_schemes: Vec<String>,
    pub interstitial_url: String,
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
            scan_timeout_ms: 10_000,
            host_call_timeout_ms: 5_000,
            allowlist_ttl_secs: None,
            internal_schemes: default_internal_schemes(),
            interstitial_url: "chrome-extension://navguard/interstitial.html".to_string(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

pub fn default_internal_schemes() -> Vec<String> {
    [
        "chrome://",
        "chrome-extension://",
        "about:",
        "edge://",
        "moz-extension://",
        "view-source:",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl GuardConfig {
    /// Load from an explicit path, or from `{data_dir}/config.json` when it
    /// exists, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_data_dir().join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            GuardError::Config(format!("Failed to read config file `{}`: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            GuardError::Config(format!("Failed to parse config file `{}`: {err}", path.display()))
        })
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let api = url::Url::parse(&self.api_url)
            .map_err(|err| GuardError::Config(format!("Invalid apiUrl `{}`: {err}", self.api_url)))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(GuardError::Config(format!(
                "apiUrl must be http(s), got `{}`",
                self.api_url
            )));
        }
        if self.cache_capacity == 0 {
            return Err(GuardError::Config("cacheCapacity must be greater than zero".into()));
        }
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(GuardError::Config(format!(
                "cacheTtlSecs must be between 1 and {MAX_CACHE_TTL_SECS}, got {}",
                self.cache_ttl_secs
            )));
        }
        if let Some(ttl) = self.allowlist_ttl_secs {
            if ttl > MAX_ALLOWLIST_TTL_SECS {
                return Err(GuardError::Config(format!(
                    "allowlistTtlSecs must be at most {MAX_ALLOWLIST_TTL_SECS}, got {ttl}"
                )));
            }
        }
        if self.interstitial_url.is_empty() {
            return Err(GuardError::Config("interstitialUrl cannot be empty".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        (self.scan_timeout_ms > 0).then(|| Duration::from_millis(self.scan_timeout_ms))
    }

    pub fn host_call_timeout(&self) -> Duration {
        Duration::from_millis(self.host_call_timeout_ms)
    }

    pub fn allowlist_ttl(&self) -> Option<Duration> {
        self.allowlist_ttl_secs.map(Duration::from_secs)
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolved_data_dir().join(DATABASE_FILE)
    }
}

/// Platform data directory, e.g. `~/.local/share/navguard` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("navguard")
}
