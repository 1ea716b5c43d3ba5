//! Built-in executor set and the registry that routes to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use edgerelay_core::{CommandExecutor, ExecutorError};

/// Routes each command name to the executor registered under it.
pub struct ExecutorRegistry {
    entries: HashMap<String, Arc<dyn CommandExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register one executor under each of the given command names.
    pub fn register(&mut self, commands: &[&str], executor: Arc<dyn CommandExecutor>) {
        for command in commands {
            self.entries.insert(command.to_string(), executor.clone());
        }
    }

    /// Registered command names, sorted for stable logs.
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ExecutorRegistry {
    async fn execute(&self, command: &str, args: &Value) -> Result<Value, ExecutorError> {
        match self.entries.get(command) {
            Some(executor) => executor.execute(command, args).await,
            None => Err(ExecutorError::UnknownCommand(command.to_string())),
        }
    }
}

/// Diagnostics commands every device answers out of the box.
pub struct BuiltinExecutors {
    client_id: String,
    started_at: Instant,
}

impl BuiltinExecutors {
    /// Command names this set handles.
    pub const COMMANDS: &'static [&'static str] = &["ping", "echo", "device_info", "uptime"];

    /// Create the built-in set for this device identity.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            started_at: Instant::now(),
        }
    }
}

#[async_trait]
impl CommandExecutor for BuiltinExecutors {
    async fn execute(&self, command: &str, args: &Value) -> Result<Value, ExecutorError> {
        match command {
            "ping" => Ok(json!({"pong": true})),
            "echo" => Ok(json!({"echo": args.clone()})),
            "device_info" => Ok(json!({
                "client_id": self.client_id,
                "version": env!("CARGO_PKG_VERSION"),
                "os": std::env::consts::OS,
                "arch": std::env::consts::ARCH,
            })),
            "uptime" => Ok(json!({"uptime_secs": self.started_at.elapsed().as_secs()})),
            other => Err(ExecutorError::UnknownCommand(other.to_string())),
        }
    }
}
