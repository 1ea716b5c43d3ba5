//! Janitor sweeps.
//!
//! Two independent periodic tasks bound the engine's memory: one trims the
//! completed-identifier cache, one reaps in-flight sequences that were
//! started but never finished (executor hang, process signal mid-loop).
//! Sweeps are pure maintenance: they never publish and never touch the
//! executor; an empty sweep is a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use edgerelay_core::JanitorConfig;

use crate::engine::EngineState;

/// Handles to the two running sweep tasks.
pub struct JanitorHandle {
    trim_task: JoinHandle<()>,
    reap_task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Stop both sweeps. Safe to call during shutdown while a dispatch is
    /// still draining; sweeps only ever run between lock acquisitions.
    pub fn shutdown(&self) {
        self.trim_task.abort();
        self.reap_task.abort();
    }
}

/// Spawn the cache-trim and abandonment-reap tasks over shared state.
pub(crate) fn spawn(state: Arc<Mutex<EngineState>>, config: JanitorConfig) -> JanitorHandle {
    let trim_state = state.clone();
    let trim_config = config.clone();
    let trim_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(trim_config.cache_trim_interval());
        loop {
            ticker.tick().await;
            let mut state = trim_state.lock().await;
            let removed = trim_cache(&mut state, trim_config.cache_max_entries);
            if removed > 0 {
                info!(removed, remaining = state.id_cache.len(), "trimmed identifier cache");
            } else {
                debug!(cached = state.id_cache.len(), "identifier cache within bounds");
            }
        }
    });

    let reap_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.reap_interval());
        loop {
            ticker.tick().await;
            let mut state = state.lock().await;
            let reaped = reap_abandoned(&mut state, config.abandoned_after(), Utc::now());
            if reaped.is_empty() {
                debug!(in_flight = state.in_flight.len(), "no abandoned sequences");
            }
        }
    });

    JanitorHandle {
        trim_task,
        reap_task,
    }
}

/// Drop oldest cache entries until at most `max_entries` remain.
pub(crate) fn trim_cache(state: &mut EngineState, max_entries: usize) -> usize {
    let mut removed = 0;
    while state.id_cache.len() > max_entries {
        state.id_cache.pop_front();
        removed += 1;
    }
    removed
}

/// Remove every in-flight record older than `max_age`, logging each
/// eviction with its unprocessed command count.
pub(crate) fn reap_abandoned(
    state: &mut EngineState,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> Vec<String> {
    let expired: Vec<String> = state
        .in_flight
        .iter()
        .filter(|(_, record)| record.age(now) > max_age)
        .map(|(id, _)| id.clone())
        .collect();

    for id in &expired {
        if let Some(record) = state.in_flight.remove(id) {
            warn!(
                sequence_id = %id,
                pending = record.pending(),
                answered = record.answers.len(),
                "evicting abandoned sequence"
            );
        }
    }
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgerelay_core::{Message, SequenceRecord};
    use serde_json::Value;

    fn state_with_cache(ids: &[&str]) -> EngineState {
        let mut state = EngineState::default();
        state.id_cache = ids.iter().map(|s| s.to_string()).collect();
        state
    }

    fn record_aged(age: chrono::Duration) -> SequenceRecord {
        let mut record =
            SequenceRecord::new(vec![Message::new("s", "cmd", Value::Null)]);
        record.started_at = Utc::now() - age;
        record
    }

    #[test]
    fn test_trim_noop_at_bound() {
        let mut state = state_with_cache(&["a", "b"]);
        assert_eq!(trim_cache(&mut state, 2), 0);
        assert_eq!(state.id_cache.len(), 2);
    }

    #[test]
    fn test_trim_removes_oldest_first() {
        let mut state = state_with_cache(&["a", "b", "c", "d"]);
        assert_eq!(trim_cache(&mut state, 2), 2);
        assert_eq!(state.id_cache, ["c", "d"]);
    }

    #[test]
    fn test_trim_empty_cache() {
        let mut state = EngineState::default();
        assert_eq!(trim_cache(&mut state, 2), 0);
    }

    #[test]
    fn test_reap_removes_only_expired() {
        let mut state = EngineState::default();
        state
            .in_flight
            .insert("old".to_string(), record_aged(chrono::Duration::days(2)));
        state
            .in_flight
            .insert("fresh".to_string(), record_aged(chrono::Duration::minutes(5)));

        let reaped = reap_abandoned(&mut state, chrono::Duration::days(1), Utc::now());

        assert_eq!(reaped, vec!["old".to_string()]);
        assert!(!state.in_flight.contains_key("old"));
        assert!(state.in_flight.contains_key("fresh"));
    }

    #[test]
    fn test_reap_nothing_to_do() {
        let mut state = EngineState::default();
        let reaped = reap_abandoned(&mut state, chrono::Duration::days(1), Utc::now());
        assert!(reaped.is_empty());
    }

    #[test]
    fn test_reap_at_exact_threshold_keeps_record() {
        let mut state = EngineState::default();
        let now = Utc::now();
        let mut record = SequenceRecord::new(Vec::new());
        record.started_at = now - chrono::Duration::days(1);
        state.in_flight.insert("edge".to_string(), record);

        // Strictly-older-than semantics: exactly at the threshold survives.
        let reaped = reap_abandoned(&mut state, chrono::Duration::days(1), now);
        assert!(reaped.is_empty());
        assert!(state.in_flight.contains_key("edge"));
    }
}
