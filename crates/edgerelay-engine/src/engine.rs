//! Engine facade.
//!
//! Owns the in-flight sequence map and the completed-identifier cache, and
//! exposes the single entry point the transport consumer invokes per
//! inbound message. Dispatch runs synchronously inside that call: one
//! sequence's results are always published in command order and two
//! sequences' results never interleave.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use edgerelay_core::{
    reply, CommandExecutor, EngineConfig, EnvelopeError, RawEnvelope, SequenceRecord, Transport,
    TransportError, ENVELOPE_HINT,
};

use crate::assembler;
use crate::janitor::{self, JanitorHandle};

/// Shared mutable state: the only data touched by both the message path and
/// the janitor timers, guarded by one mutex.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    /// In-flight sequences keyed by sequence id.
    pub(crate) in_flight: HashMap<String, SequenceRecord>,
    /// Recently completed sequence ids, oldest first.
    pub(crate) id_cache: VecDeque<String>,
    /// Sequences dispatched to completion.
    pub(crate) sequences_completed: u64,
    /// Individual commands executed.
    pub(crate) commands_executed: u64,
    /// Own answers recognized and dropped.
    pub(crate) echoes_dropped: u64,
    /// Envelopes dropped by validation.
    pub(crate) envelopes_rejected: u64,
}

/// Point-in-time counters snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    /// Sequences dispatched to completion.
    pub sequences_completed: u64,
    /// Individual commands executed.
    pub commands_executed: u64,
    /// Own answers recognized and dropped.
    pub echoes_dropped: u64,
    /// Envelopes dropped by validation.
    pub envelopes_rejected: u64,
    /// Sequences currently in flight.
    pub in_flight: usize,
    /// Identifiers currently cached.
    pub cached_ids: usize,
}

/// Command sequencing and dispatch engine for one device identity.
pub struct Engine {
    config: EngineConfig,
    executor: Arc<dyn CommandExecutor>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<EngineState>>,
}

impl Engine {
    /// Create an engine wired to its executor and transport.
    pub fn new(
        config: EngineConfig,
        executor: Arc<dyn CommandExecutor>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            executor,
            transport,
            state: Arc::new(Mutex::new(EngineState::default())),
        }
    }

    /// Start the two janitor sweeps for this engine's state.
    pub fn start_janitor(&self) -> JanitorHandle {
        janitor::spawn(self.state.clone(), self.config.janitor.clone())
    }

    /// Handle one inbound payload from the subscribed topic.
    ///
    /// Validation failures and echoes are absorbed here (logged, counted,
    /// dropped); only transport failures surface to the caller. On a publish
    /// failure the sequence record intentionally stays in flight so the
    /// abandonment reaper eventually clears it.
    pub async fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let raw = match RawEnvelope::decode(payload) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, hint = ENVELOPE_HINT, "dropping undecodable payload");
                self.state.lock().await.envelopes_rejected += 1;
                return Ok(());
            }
        };

        // Our own answers come back on the same subscribed topic; anything
        // carrying a known sequence id must not re-enter dispatch.
        if let Some(id) = raw.carried_id() {
            if self.is_echo(id).await {
                debug!(sequence_id = %id, "dropping echoed answer");
                self.state.lock().await.echoes_dropped += 1;
                return Ok(());
            }
        }

        let envelope = match raw.validate(&self.config.client_id) {
            Ok(envelope) => envelope,
            Err(err @ EnvelopeError::ClientIdMismatch { .. }) => {
                debug!(error = %err, "envelope addressed to another device");
                self.state.lock().await.envelopes_rejected += 1;
                return Ok(());
            }
            Err(err) => {
                warn!(
                    kind = err.kind(),
                    error = %err,
                    hint = ENVELOPE_HINT,
                    "dropping invalid envelope"
                );
                self.state.lock().await.envelopes_rejected += 1;
                return Ok(());
            }
        };

        let sequence_id = format!("{}-{}", topic, Uuid::new_v4());
        let queue = assembler::unpack(&envelope, &sequence_id);
        if queue.is_empty() {
            info!(sequence_id = %sequence_id, "envelope carried no commands, nothing to do");
            return Ok(());
        }

        info!(
            sequence_id = %sequence_id,
            commands = queue.len(),
            "starting sequence"
        );
        {
            let mut state = self.state.lock().await;
            state
                .in_flight
                .insert(sequence_id.clone(), SequenceRecord::new(queue));
        }

        self.dispatch(&sequence_id).await?;

        let mut state = self.state.lock().await;
        state.in_flight.remove(&sequence_id);
        state.id_cache.push_back(sequence_id.clone());
        state.sequences_completed += 1;
        drop(state);

        info!(sequence_id = %sequence_id, "sequence completed");
        Ok(())
    }

    /// Run one sequence's messages front-to-back, publishing each result.
    ///
    /// The state lock is never held across an executor call or a publish.
    async fn dispatch(&self, sequence_id: &str) -> Result<(), TransportError> {
        loop {
            let next = {
                let mut state = self.state.lock().await;
                state
                    .in_flight
                    .get_mut(sequence_id)
                    .and_then(|record| record.incoming.pop_front())
            };
            let Some(message) = next else { break };

            let result = match self.executor.execute(&message.command, &message.args).await {
                Ok(output) => reply::success(sequence_id, &message.command, output),
                Err(err) => {
                    warn!(
                        sequence_id,
                        command = %message.command,
                        kind = err.kind(),
                        error = %err,
                        "command failed"
                    );
                    reply::failure(sequence_id, &message.command, &err)
                }
            };

            {
                let mut state = self.state.lock().await;
                state.commands_executed += 1;
                if let Some(record) = state.in_flight.get_mut(sequence_id) {
                    record.answers.push(result.clone());
                }
            }

            let payload = serde_json::to_vec(&result)
                .map_err(|err| TransportError::Publish(err.to_string()))?;
            self.transport.publish(&self.config.topic, payload).await?;
            debug!(sequence_id, command = %message.command, "published result");
        }
        Ok(())
    }

    /// Whether `id` belongs to a sequence we are running or recently ran.
    async fn is_echo(&self, id: &str) -> bool {
        let state = self.state.lock().await;
        state.in_flight.contains_key(id) || state.id_cache.iter().any(|cached| cached == id)
    }

    /// Trim the identifier cache down to its configured bound.
    ///
    /// Returns the number of entries removed. Called by the janitor timer;
    /// exposed for embedders that manage their own sweep cadence.
    pub async fn trim_id_cache(&self) -> usize {
        let mut state = self.state.lock().await;
        janitor::trim_cache(&mut state, self.config.janitor.cache_max_entries)
    }

    /// Remove in-flight records older than the abandonment threshold.
    ///
    /// Returns the reaped sequence ids.
    pub async fn reap_abandoned(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        janitor::reap_abandoned(
            &mut state,
            self.config.janitor.abandoned_after(),
            chrono::Utc::now(),
        )
    }

    /// Snapshot the engine counters.
    pub async fn stats(&self) -> EngineStats {
        let state = self.state.lock().await;
        EngineStats {
            sequences_completed: state.sequences_completed,
            commands_executed: state.commands_executed,
            echoes_dropped: state.echoes_dropped,
            envelopes_rejected: state.envelopes_rejected,
            in_flight: state.in_flight.len(),
            cached_ids: state.id_cache.len(),
        }
    }
}
