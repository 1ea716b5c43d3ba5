//! MQTT broker configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection settings for the MQTT broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host.
    #[serde(default = "default_broker")]
    pub broker: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client ID (generated if not provided).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Clean session flag.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
}

fn default_broker() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u64 {
    60
}
fn default_clean_session() -> bool {
    true
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::new(default_broker())
    }
}

impl MqttConfig {
    /// Create a configuration for a broker host with default settings.
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: default_port(),
            client_id: None,
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive(),
            clean_session: default_clean_session(),
        }
    }

    /// Set the broker port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set credentials.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set an explicit client ID.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// The configured client ID, or a freshly generated one.
    pub fn effective_client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("edgerelay-{}", Uuid::new_v4()))
    }

    /// `host:port` form of the broker address.
    pub fn full_broker_addr(&self) -> String {
        format!("{}:{}", self.broker, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive_secs, 60);
        assert!(config.clean_session);
        assert!(config.client_id.is_none());
    }

    #[test]
    fn test_builders() {
        let config = MqttConfig::new("broker.example.com")
            .with_port(8883)
            .with_auth("user", "pass")
            .with_client_id("dev-1");

        assert_eq!(config.full_broker_addr(), "broker.example.com:8883");
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.password, Some("pass".to_string()));
        assert_eq!(config.effective_client_id(), "dev-1");
    }

    #[test]
    fn test_generated_client_id() {
        let config = MqttConfig::default();
        assert!(config.effective_client_id().starts_with("edgerelay-"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MqttConfig =
            serde_json::from_str(r#"{"broker": "10.0.0.2"}"#).unwrap();
        assert_eq!(config.broker, "10.0.0.2");
        assert_eq!(config.port, 1883);
    }
}
