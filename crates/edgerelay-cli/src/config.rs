//! Service configuration: JSON file, environment overrides, flag overrides.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use edgerelay_core::JanitorConfig;
use edgerelay_mqtt::MqttConfig;

/// Full service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device identity envelopes must be addressed to (generated when
    /// absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Topic the service subscribes to and publishes results on.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Broker connection settings.
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Janitor sweep settings.
    #[serde(default)]
    pub janitor: JanitorConfig,
}

fn default_topic() -> String {
    "edgerelay/commands".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            topic: default_topic(),
            mqtt: MqttConfig::default(),
            janitor: JanitorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply broker/topic overrides from the environment.
    ///
    /// Empty values are ignored, matching how unset deployment variables
    /// usually surface.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("EDGERELAY_BROKER") {
            if !value.is_empty() {
                self.mqtt.broker = value;
            }
        }
        if let Ok(value) = std::env::var("EDGERELAY_PORT") {
            if let Ok(port) = value.parse() {
                self.mqtt.port = port;
            }
        }
        if let Ok(value) = std::env::var("EDGERELAY_USERNAME") {
            if !value.is_empty() {
                self.mqtt.username = Some(value);
            }
        }
        if let Ok(value) = std::env::var("EDGERELAY_PASSWORD") {
            if !value.is_empty() {
                self.mqtt.password = Some(value);
            }
        }
        if let Ok(value) = std::env::var("EDGERELAY_TOPIC") {
            if !value.is_empty() {
                self.topic = value;
            }
        }
    }
}
