//! Core types for the EdgeRelay command engine.
//!
//! Provides:
//! - Wire envelope decoding and validation
//! - Atomic command messages and per-sequence records
//! - Result (reply) construction
//! - Collaborator contracts: transport and command executor
//! - Engine configuration

pub mod config;
pub mod envelope;
pub mod executor;
pub mod message;
pub mod reply;
pub mod transport;

// Re-exports
pub use config::{EngineConfig, JanitorConfig};
pub use envelope::{Envelope, EnvelopeError, RawEnvelope, ENVELOPE_HINT};
pub use executor::{CommandExecutor, ExecutorError};
pub use message::{Message, SequenceRecord};
pub use transport::{InboundMessage, Transport, TransportError};
