//! Command sequencing and dispatch engine.
//!
//! Receives JSON command envelopes from a publish/subscribe transport,
//! rebuilds them into ordered sequences of atomic commands, executes each
//! command against a pluggable executor and publishes one result per
//! command, in order. Filters out echoes of its own answers and sweeps
//! stale bookkeeping on timers.

pub mod assembler;
pub mod engine;
pub mod janitor;

// Re-exports
pub use engine::{Engine, EngineStats};
pub use janitor::JanitorHandle;
