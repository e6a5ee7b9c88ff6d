//! Process configuration
//!
//! Everything except the API key is read once at startup. The key is read
//! per request through [`CredentialSource`], so a missing key fails the
//! request rather than the boot.

use std::env;
use std::path::PathBuf;

use crate::services::gateway::DEFAULT_BASE_URL;

/// Environment variable holding the WakaTime API key
pub const API_KEY_ENV: &str = "WAKATIME_API_KEY";

const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Listen address for `serve`
    pub bind_addr: String,
    /// WakaTime host; the summaries path and range are fixed
    pub api_base_url: String,
    /// Optional JSON file overriding the achievement thresholds
    pub achievements_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            achievements_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_string("WAKASTATS_BIND", DEFAULT_BIND),
            api_base_url: env_string("WAKATIME_API_URL", DEFAULT_BASE_URL),
            achievements_path: env_opt("WAKASTATS_ACHIEVEMENTS").map(PathBuf::from),
        }
    }
}

/// Where the gateway gets the WakaTime key from
pub trait CredentialSource: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Reads `WAKATIME_API_KEY` from the process environment on every call
#[derive(Debug, Clone, Default)]
pub struct EnvCredential;

impl CredentialSource for EnvCredential {
    fn api_key(&self) -> Option<String> {
        env_opt(API_KEY_ENV)
    }
}

/// Fixed key, for tests and one-shot commands
#[derive(Debug, Clone)]
pub struct StaticCredential(pub Option<String>);

impl CredentialSource for StaticCredential {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

fn env_string(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}
