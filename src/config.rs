//! Downloader settings and dynamic reconfiguration.
//!
//! Settings are loaded once (TOML or defaults) and published over a
//! `tokio::sync::watch` channel so the poll interval can change while the
//! downloader is waiting between cycles.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;

fn default_endpoint() -> String {
    "https://datasets.fleetsync.io/v1/catalog".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3 * 24 * 60 * 60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_validity() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

/// Downloader configuration.
///
/// `poll_interval` is the only dynamic setting; everything else is read
/// point-in-time at the start of the operation that needs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Catalog endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Delay between sync cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Per-request timeout for catalog and payload fetches
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// How long a dataset stays valid without a successful check
    #[serde(default = "default_validity")]
    pub dataset_validity: Duration,

    /// Datasets eligible for download; `None` means all catalog entries
    #[serde(default)]
    pub enabled_datasets: Option<BTreeSet<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            endpoint: default_endpoint(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            dataset_validity: default_validity(),
            enabled_datasets: None,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document, filling omitted fields with
    /// defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(SyncError::Config("endpoint must not be empty".to_string()));
        }
        if self.poll_interval < Duration::from_secs(1) {
            return Err(SyncError::Config(
                "poll_interval must be at least 1s".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a dataset is still referenced by configuration.
    pub fn dataset_enabled(&self, name: &str) -> bool {
        match &self.enabled_datasets {
            Some(enabled) => enabled.contains(name),
            None => true,
        }
    }

    /// Create the settings notification channel. The sender side belongs to
    /// whatever applies configuration updates; the handle goes to the
    /// downloader.
    pub fn channel(self) -> (watch::Sender<Settings>, SettingsHandle) {
        let (tx, rx) = watch::channel(self);
        (tx, SettingsHandle { rx })
    }
}

/// Read side of the dynamic settings channel.
#[derive(Clone)]
pub struct SettingsHandle {
    rx: watch::Receiver<Settings>,
}

impl SettingsHandle {
    /// Point-in-time settings snapshot.
    pub fn current(&self) -> Settings {
        self.rx.borrow().clone()
    }

    pub fn poll_interval(&self) -> Duration {
        self.rx.borrow().poll_interval
    }

    /// Wait until the settings change. Returns `Err` when the sender is
    /// dropped, which the downloader treats as terminal.
    pub async fn changed(&mut self) -> std::result::Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(3 * 24 * 60 * 60));
        assert!(settings.dataset_enabled("anything.db"));
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml_str(
            r#"
            endpoint = "https://host/v1/database"
            poll_interval = { secs = 60, nanos = 0 }
            "#,
        )
        .unwrap();
        assert_eq!(settings.endpoint, "https://host/v1/database");
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        // untouched fields fall back to defaults
        assert_eq!(settings.dataset_validity, default_validity());
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let err = Settings::from_toml_str(r#"endpoint = """#).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_enabled_datasets_filter() {
        let mut settings = Settings::default();
        settings.enabled_datasets = Some(["geo.db".to_string()].into_iter().collect());
        assert!(settings.dataset_enabled("geo.db"));
        assert!(!settings.dataset_enabled("asn.db"));
    }

    #[tokio::test]
    async fn test_channel_delivers_updates() {
        let (tx, mut handle) = Settings::default().channel();
        let mut updated = Settings::default();
        updated.poll_interval = Duration::from_secs(10);
        tx.send(updated).unwrap();
        handle.changed().await.unwrap();
        assert_eq!(handle.poll_interval(), Duration::from_secs(10));
    }
}
