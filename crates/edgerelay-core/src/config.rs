//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity envelopes must be addressed to.
    pub client_id: String,
    /// Topic results are published back on.
    pub topic: String,
    /// Janitor sweep settings.
    #[serde(default)]
    pub janitor: JanitorConfig,
}

/// Settings for the two maintenance sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Seconds between identifier-cache trims.
    #[serde(default = "default_cache_trim_interval")]
    pub cache_trim_interval_secs: u64,

    /// Identifier-cache size the trim sweep enforces.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Seconds between abandoned-sequence reaps.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,

    /// Age in seconds after which an in-flight sequence counts as abandoned.
    #[serde(default = "default_abandoned_after")]
    pub abandoned_after_secs: u64,
}

fn default_cache_trim_interval() -> u64 {
    300
}
fn default_cache_max_entries() -> usize {
    16
}
fn default_reap_interval() -> u64 {
    3600
}
fn default_abandoned_after() -> u64 {
    86_400
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            cache_trim_interval_secs: default_cache_trim_interval(),
            cache_max_entries: default_cache_max_entries(),
            reap_interval_secs: default_reap_interval(),
            abandoned_after_secs: default_abandoned_after(),
        }
    }
}

impl JanitorConfig {
    /// Cache-trim period as a [`Duration`].
    pub fn cache_trim_interval(&self) -> Duration {
        Duration::from_secs(self.cache_trim_interval_secs)
    }

    /// Reap period as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Abandonment age threshold as a [`chrono::Duration`].
    pub fn abandoned_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.abandoned_after_secs as i64)
    }
}
