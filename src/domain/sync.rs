//! Sync-related domain models and configuration.
//!
//! Contains the sync state machine, the persisted sync metadata and the
//! application configuration loaded from TOML.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a freshly fetched remote batch is merged into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePolicy {
    /// Append each remote quote whose text is not already present locally.
    #[default]
    AppendNovel,
    /// Drop every server-labelled quote, then append the whole batch.
    ReplaceServer,
}

impl std::str::FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append-novel" | "append" => Ok(Self::AppendNovel),
            "replace-server" | "replace" => Ok(Self::ReplaceServer),
            _ => Err(format!(
                "Unknown policy: {s}. Use: append-novel, replace-server"
            )),
        }
    }
}

impl std::fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppendNovel => write!(f, "append-novel"),
            Self::ReplaceServer => write!(f, "replace-server"),
        }
    }
}

/// Configuration for the sync agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between sync runs in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Whether periodic sync runs in interactive sessions.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Remote collection URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Number of remote records requested per sync.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Reconciliation policy.
    #[serde(default)]
    pub policy: ReconcilePolicy,

    /// POST each locally added quote to the remote endpoint.
    #[serde(default)]
    pub post_on_add: bool,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            page_size: default_page_size(),
            policy: ReconcilePolicy::default(),
            post_on_add: false,
            timeout_secs: default_timeout(),
        }
    }
}

const fn default_interval() -> u64 {
    120 // 2 minutes
}

const fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://jsonplaceholder.typicode.com/posts".to_string()
}

const fn default_page_size() -> usize {
    5
}

const fn default_timeout() -> u64 {
    10
}

/// Terminal display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How long a transient sync status stays visible in the shell.
    #[serde(default = "default_status_ttl")]
    pub status_ttl_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            status_ttl_ms: default_status_ttl(),
        }
    }
}

const fn default_status_ttl() -> u64 {
    2500
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Sync agent configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Path configuration.
    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quote-deck")
    }

    /// Get the durable key-value database path.
    #[must_use]
    pub fn store_db_path(&self) -> PathBuf {
        self.data_dir().join("store.db")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }

    /// Get the exports directory path.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir().join("exports")
    }
}

/// Advisory record of the most recent successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// When the sync finished.
    pub last_sync: DateTime<Utc>,
    /// Quotes merged from the server in that sync.
    pub added_from_server: usize,
}

impl SyncMetadata {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn now(added_from_server: usize) -> Self {
        Self {
            last_sync: Utc::now(),
            added_from_server,
        }
    }
}

/// Sync agent state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// Fetch in flight.
    Syncing,
    /// Last run merged `added` quotes.
    Synced { added: usize },
    /// Last run failed; the store was left untouched.
    Failed { reason: String },
}

impl SyncPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Syncing)
                | (Self::Syncing, Self::Synced { .. } | Self::Failed { .. })
                | (Self::Synced { .. } | Self::Failed { .. }, Self::Idle)
        )
    }

    /// Move to `next` if legal. Returns whether the transition happened.
    pub fn transition(&mut self, next: Self) -> bool {
        if self.can_transition_to(&next) {
            *self = next;
            true
        } else {
            tracing::warn!(from = ?self, to = ?next, "Rejected sync phase transition");
            false
        }
    }

    /// Transient status line for this phase, if any.
    #[must_use]
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Syncing => Some("syncing...".to_string()),
            Self::Synced { added } => Some(format!("synced ({added} new)")),
            Self::Failed { .. } => Some("sync failed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sync.interval_secs, 120);
        assert!(config.sync.enabled);
        assert_eq!(config.sync.page_size, 5);
        assert_eq!(config.sync.policy, ReconcilePolicy::AppendNovel);
        assert!(!config.sync.post_on_add);
    }

    #[test]
    fn test_phase_happy_path() {
        let mut phase = SyncPhase::default();
        assert!(phase.transition(SyncPhase::Syncing));
        assert!(phase.transition(SyncPhase::Synced { added: 2 }));
        assert_eq!(phase.status_message().as_deref(), Some("synced (2 new)"));
        assert!(phase.transition(SyncPhase::Idle));
        assert_eq!(phase.status_message(), None);
    }

    #[test]
    fn test_phase_rejects_illegal_moves() {
        let mut phase = SyncPhase::Idle;
        assert!(!phase.transition(SyncPhase::Synced { added: 1 }));
        assert_eq!(phase, SyncPhase::Idle);

        phase = SyncPhase::Syncing;
        assert!(!phase.transition(SyncPhase::Syncing));
        assert!(phase.transition(SyncPhase::Failed {
            reason: "offline".into()
        }));
        assert!(!phase.transition(SyncPhase::Syncing));
    }

    #[test]
    fn test_metadata_json_shape() {
        let meta = SyncMetadata::now(3);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["addedFromServer"], 3);
        assert!(json["lastSync"].is_string());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "replace-server".parse::<ReconcilePolicy>(),
            Ok(ReconcilePolicy::ReplaceServer)
        );
        assert!("merge".parse::<ReconcilePolicy>().is_err());
        let cfg: SyncConfig = toml::from_str("policy = \"replace-server\"").unwrap();
        assert_eq!(cfg.policy, ReconcilePolicy::ReplaceServer);
    }
}
