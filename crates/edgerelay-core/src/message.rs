//! Atomic command messages and per-sequence bookkeeping.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One atomic unit of work: a single command split out of an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Correlation id shared by every message of one envelope.
    pub sequence_id: String,
    /// Command name to execute.
    pub command: String,
    /// Command arguments, `null` when the sender supplied none.
    pub args: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(sequence_id: impl Into<String>, command: impl Into<String>, args: Value) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            command: command.into(),
            args,
            created_at: Utc::now(),
        }
    }
}

/// In-flight state for one sequence, keyed by its `sequence_id`.
///
/// Created when an envelope passes echo-filtering and validation, mutated
/// only by the dispatch loop processing that exact sequence, removed on
/// completion or by the abandonment reaper.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    /// Messages awaiting execution, consumed front-to-back.
    pub incoming: VecDeque<Message>,
    /// Published results, append-only, in consumption order.
    pub answers: Vec<Value>,
    /// When the record was created.
    pub started_at: DateTime<Utc>,
}

impl SequenceRecord {
    /// Create a record holding the assembled message queue.
    pub fn new(incoming: Vec<Message>) -> Self {
        Self {
            incoming: incoming.into(),
            answers: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Age of the record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }

    /// Number of commands not yet executed.
    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}
