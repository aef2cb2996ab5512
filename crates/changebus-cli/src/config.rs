//! CLI configuration management.

use changebus_core::ClosedSource;
use changebus_nats::NatsConfig;
use changebus_trace::TracingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// NATS connection and stream settings.
    #[serde(default)]
    pub nats: NatsConfig,
    /// Subject type changes are published under.
    #[serde(default = "default_subject_type")]
    pub subject_type: String,
    /// Prefix for generated subject IDs.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Value of the `source` field on published changes.
    #[serde(default = "default_source")]
    pub source: String,
    /// How long a consume waits for a change.
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_secs: u64,
    /// What a consume does when the subscription ends early.
    #[serde(default)]
    pub closed_source: ClosedSource,
    /// Duration of the kickflip span.
    #[serde(default = "default_kickflip")]
    pub kickflip_millis: u64,
    #[serde(default)]
    pub tracing: TracingConfig,
}

fn default_subject_type() -> String {
    "load-balancer".to_string()
}

fn default_id_prefix() -> String {
    "loadbal".to_string()
}

fn default_source() -> String {
    "api".to_string()
}

fn default_receive_timeout() -> u64 {
    120
}

fn default_kickflip() -> u64 {
    5000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            subject_type: default_subject_type(),
            id_prefix: default_id_prefix(),
            source: default_source(),
            receive_timeout_secs: default_receive_timeout(),
            closed_source: ClosedSource::default(),
            kickflip_millis: default_kickflip(),
            tracing: TracingConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist; the default per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Get the default configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("dev", "changebus", "changebus")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }

    pub fn kickflip_duration(&self) -> Duration {
        Duration::from_millis(self.kickflip_millis)
    }

    /// Subscription topic matching every change to the configured subject type.
    pub fn default_topic(&self) -> String {
        format!("*.{}", self.subject_type)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
