//! MQTT transport for the EdgeRelay engine.
//!
//! Wraps rumqttc: connects to one broker, subscribes to the device's
//! command topic, forwards inbound publishes over a channel and publishes
//! results at QoS 1. Subscriptions are renewed whenever the broker comes
//! back without session state.

pub mod client;
pub mod config;

// Re-exports
pub use client::MqttTransport;
pub use config::MqttConfig;
