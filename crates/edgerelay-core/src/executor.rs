//! Command executor contract.
//!
//! The engine routes every command to one executor and never interprets
//! command semantics itself. The embedding application supplies the
//! implementation, typically a registry of named executors.

use async_trait::async_trait;
use serde_json::Value;

/// A pluggable unit that knows how to execute named commands.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `command` with `args` and return a structured result.
    ///
    /// A failure is the result of that single command, not of the sequence
    /// that carried it.
    async fn execute(&self, command: &str, args: &Value) -> Result<Value, ExecutorError>;
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid arguments for `{command}`: {reason}")]
    InvalidArgs { command: String, reason: String },

    #[error("command failed: {0}")]
    Failed(String),
}

impl ExecutorError {
    /// Short identifier for log fields and error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::UnknownCommand(_) => "unknown_command",
            ExecutorError::InvalidArgs { .. } => "invalid_args",
            ExecutorError::Failed(_) => "failed",
        }
    }
}
