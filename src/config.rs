//! Static configuration: base URLs, user agent, timeouts, retry policy.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_base_url() -> String {
    "https://drive-pc.quark.cn".to_string()
}

fn default_portal_url() -> String {
    "https://pan.quark.cn".to_string()
}

fn default_user_agent() -> String {
    // Fixed product/channel identifier the desktop client sends; the API
    // rejects generic agents.
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     quark-cloud-drive/3.14.2 Chrome/112.0.5615.165 Electron/24.1.3.8 Safari/537.36 \
     Channel/pckk_other_ch"
        .to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_save_path() -> String {
    "/".to_string()
}

/// Configuration for a Quark client, read once at startup and immutable
/// thereafter. All fields have defaults so a partial JSON file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the drive API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the web portal (account info, share link display).
    #[serde(default = "default_portal_url")]
    pub portal_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How many times a transport failure is retried before giving up.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base delay between retries; attempt N waits N times this value.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Destination folder path used when the caller does not specify one.
    #[serde(default = "default_save_path")]
    pub default_save_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            portal_url: default_portal_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            default_save_path: default_save_path(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
