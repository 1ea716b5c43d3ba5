//! Outgoing result construction.
//!
//! Every executed command produces one wire result: the executor's
//! structured output merged with the engine's correlation metadata. Object
//! results merge their fields, array results become `output_0..output_n`,
//! scalars land under `output`. Metadata keys always win so answers stay
//! correlatable no matter what an executor returns.

use serde_json::{Map, Value};
use tracing::debug;

use crate::executor::ExecutorError;

/// Build the wire result for a successfully executed command.
pub fn success(sequence_id: &str, command: &str, result: Value) -> Value {
    let mut reply = metadata(sequence_id, command);
    match result {
        Value::Object(fields) => {
            for (key, value) in fields {
                if reply.contains_key(&key) {
                    debug!(command, key, "executor result key shadows reply metadata, skipping");
                    continue;
                }
                reply.insert(key, value);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                reply.insert(format!("output_{i}"), item);
            }
        }
        Value::Null => {}
        scalar => {
            reply.insert("output".to_string(), scalar);
        }
    }
    Value::Object(reply)
}

/// Build the wire result for a failed command.
///
/// The failure is the step's result payload, not an engine fault; the
/// sequence continues past it.
pub fn failure(sequence_id: &str, command: &str, error: &ExecutorError) -> Value {
    let mut reply = metadata(sequence_id, command);
    let mut detail = Map::new();
    detail.insert("kind".to_string(), Value::String(error.kind().to_string()));
    detail.insert("message".to_string(), Value::String(error.to_string()));
    reply.insert("error".to_string(), Value::Object(detail));
    Value::Object(reply)
}

fn metadata(sequence_id: &str, command: &str) -> Map<String, Value> {
    let mut reply = Map::new();
    reply.insert(
        "sequence_id".to_string(),
        Value::String(sequence_id.to_string()),
    );
    reply.insert("command".to_string(), Value::String(command.to_string()));
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_result_merges_fields() {
        let reply = success("s-1", "ping", json!({"pong": true}));
        assert_eq!(reply["sequence_id"], "s-1");
        assert_eq!(reply["command"], "ping");
        assert_eq!(reply["pong"], true);
    }

    #[test]
    fn test_array_result_becomes_numbered_outputs() {
        let reply = success("s-1", "list", json!(["a", "b"]));
        assert_eq!(reply["output_0"], "a");
        assert_eq!(reply["output_1"], "b");
    }

    #[test]
    fn test_scalar_result_lands_under_output() {
        let reply = success("s-1", "count", json!(42));
        assert_eq!(reply["output"], 42);
    }

    #[test]
    fn test_null_result_is_metadata_only() {
        let reply = success("s-1", "noop", Value::Null);
        let obj = reply.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(reply["sequence_id"], "s-1");
    }

    #[test]
    fn test_metadata_wins_over_result_keys() {
        let reply = success("s-1", "sneaky", json!({"sequence_id": "forged", "ok": 1}));
        assert_eq!(reply["sequence_id"], "s-1");
        assert_eq!(reply["ok"], 1);
    }

    #[test]
    fn test_failure_carries_structured_error() {
        let err = ExecutorError::Failed("boom".into());
        let reply = failure("s-1", "b", &err);
        assert_eq!(reply["sequence_id"], "s-1");
        assert_eq!(reply["command"], "b");
        assert_eq!(reply["error"]["kind"], "failed");
        assert_eq!(reply["error"]["message"], "command failed: boom");
    }
}
