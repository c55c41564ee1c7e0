//! Warden configuration
//!
//! Config file: /etc/warden/config.toml (override with WARDEN_CONFIG).
//! An absent file falls back to defaults so a fresh install runs without any
//! setup; malformed TOML is a startup error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file location.
pub const CONFIG_PATH: &str = "/etc/warden/config.toml";

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/warden")
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_connector_url() -> String {
    "http://127.0.0.1:7810".to_string()
}

fn default_prohibited_terms() -> Vec<String> {
    vec!["hack".to_string(), "cheat".to_string()]
}

fn default_warn_limit() -> usize {
    3
}

fn default_escalation_mute_minutes() -> u64 {
    30
}

fn default_spam_window_secs() -> i64 {
    10
}

fn default_spam_repeat_limit() -> usize {
    3
}

fn default_spam_cache_capacity() -> usize {
    1024
}

fn default_support_role() -> String {
    "Support".to_string()
}

fn default_mute_role() -> String {
    "Muted".to_string()
}

fn default_ticket_category() -> String {
    "Support".to_string()
}

fn default_archive_channel() -> String {
    "ticket-logs".to_string()
}

fn default_welcome_channel() -> String {
    "welcome".to_string()
}

/// Daemon configuration. Every field has a default so partial config files
/// only override what they name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Directory holding both durable stores.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Bind address for the liveness/event HTTP server.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Base URL of the external chat-gateway connector.
    #[serde(default = "default_connector_url")]
    pub connector_url: String,

    /// Case-insensitive substrings that trigger a prohibited-term violation.
    #[serde(default = "default_prohibited_terms")]
    pub prohibited_terms: Vec<String>,

    /// Infraction count at which escalation fires.
    #[serde(default = "default_warn_limit")]
    pub warn_limit: usize,

    /// Duration of the automatic restriction applied at escalation.
    #[serde(default = "default_escalation_mute_minutes")]
    pub escalation_mute_minutes: u64,

    /// Sliding window width for duplicate-burst detection.
    #[serde(default = "default_spam_window_secs")]
    pub spam_window_secs: i64,

    /// Identical messages within the window that constitute a burst.
    #[serde(default = "default_spam_repeat_limit")]
    pub spam_repeat_limit: usize,

    /// Bound on the number of per-author spam windows kept in memory.
    #[serde(default = "default_spam_cache_capacity")]
    pub spam_cache_capacity: usize,

    /// Role authorized to close tickets and run sanctions.
    #[serde(default = "default_support_role")]
    pub support_role: String,

    /// Role granted by temporary restrictions.
    #[serde(default = "default_mute_role")]
    pub mute_role: String,

    /// Category under which ticket channels are provisioned.
    #[serde(default = "default_ticket_category")]
    pub ticket_category: String,

    /// Channel receiving closed-ticket transcripts. Archival is best-effort:
    /// if the channel does not exist the transcript is dropped.
    #[serde(default = "default_archive_channel")]
    pub archive_channel: String,

    /// Channel greeting new members, if present.
    #[serde(default = "default_welcome_channel")]
    pub welcome_channel: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listen_addr: default_listen_addr(),
            connector_url: default_connector_url(),
            prohibited_terms: default_prohibited_terms(),
            warn_limit: default_warn_limit(),
            escalation_mute_minutes: default_escalation_mute_minutes(),
            spam_window_secs: default_spam_window_secs(),
            spam_repeat_limit: default_spam_repeat_limit(),
            spam_cache_capacity: default_spam_cache_capacity(),
            support_role: default_support_role(),
            mute_role: default_mute_role(),
            ticket_category: default_ticket_category(),
            archive_channel: default_archive_channel(),
            welcome_channel: default_welcome_channel(),
        }
    }
}

impl WardenConfig {
    /// Load from the default location, honoring the WARDEN_CONFIG override.
    pub fn load() -> Result<Self> {
        let path = std::env::var("WARDEN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Load from an explicit path. Absent file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: WardenConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Path of the infraction store document.
    pub fn infraction_store_path(&self) -> PathBuf {
        self.data_dir.join("warns.json")
    }

    /// Path of the ticket counter document.
    pub fn ticket_counter_path(&self) -> PathBuf {
        self.data_dir.join("ticket_counter.json")
    }
}
