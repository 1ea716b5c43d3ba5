//! Wire envelope decoding and validation.
//!
//! An inbound payload is either a command envelope published by an operator
//! or one of our own answers arriving back on the shared topic. Decoding is
//! deliberately lenient (every field optional, unknown keys ignored) so the
//! echo check can run before any validation; validation then turns the raw
//! form into a normalized [`Envelope`] or a typed error.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Shape reminder logged alongside envelope rejections.
pub const ENVELOPE_HINT: &str = "expected {\"client_id\": string, \"seq\": integer >= 1, \
     \"cmd\": [string, ...], \"args\": [any|null, ...]}";

/// Envelope validation error types.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("payload is not a JSON object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing `client_id`")]
    MissingClientId,

    #[error("envelope addressed to `{actual}`, this device is `{expected}`")]
    ClientIdMismatch { expected: String, actual: String },

    #[error("missing `seq`")]
    MissingSeq,

    #[error("`seq` is not an integer")]
    SeqNotAnInteger,

    #[error("`seq` must be at least 1, got {0}")]
    NonPositiveSeq(i64),

    #[error("missing `cmd`")]
    MissingCmd,

    #[error("`cmd` is not an array of strings")]
    CmdNotAList,
}

impl EnvelopeError {
    /// Short identifier for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvelopeError::Malformed(_) => "malformed",
            EnvelopeError::MissingClientId => "missing_client_id",
            EnvelopeError::ClientIdMismatch { .. } => "client_id_mismatch",
            EnvelopeError::MissingSeq => "missing_seq",
            EnvelopeError::SeqNotAnInteger => "seq_not_an_integer",
            EnvelopeError::NonPositiveSeq(_) => "non_positive_seq",
            EnvelopeError::MissingCmd => "missing_cmd",
            EnvelopeError::CmdNotAList => "cmd_not_a_list",
        }
    }
}

/// Leniently decoded inbound payload, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvelope {
    pub client_id: Option<Value>,
    pub seq: Option<Value>,
    pub cmd: Option<Value>,
    pub args: Option<Value>,
    /// Correlation id stamped by the engine onto outgoing answers.
    pub sequence_id: Option<String>,
}

impl RawEnvelope {
    /// Decode a raw payload into its lenient form.
    pub fn decode(payload: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// The engine-stamped correlation id, if this payload carries one.
    ///
    /// Operator envelopes never carry it; our own answers always do.
    pub fn carried_id(&self) -> Option<&str> {
        self.sequence_id.as_deref()
    }

    /// Validate against this device's identity and normalize into an
    /// [`Envelope`].
    ///
    /// `args` misalignment with `cmd` is non-fatal: entries are padded with
    /// `null` or truncated to `cmd`'s length and the discrepancy is logged.
    /// A `seq` that disagrees with `cmd`'s length is likewise logged and the
    /// `cmd` array wins.
    pub fn validate(self, own_client_id: &str) -> Result<Envelope, EnvelopeError> {
        let client_id = match self.client_id {
            Some(Value::String(s)) => s,
            _ => return Err(EnvelopeError::MissingClientId),
        };
        if client_id != own_client_id {
            return Err(EnvelopeError::ClientIdMismatch {
                expected: own_client_id.to_string(),
                actual: client_id,
            });
        }

        let seq = match self.seq {
            None => return Err(EnvelopeError::MissingSeq),
            Some(v) => v.as_i64().ok_or(EnvelopeError::SeqNotAnInteger)?,
        };
        if seq < 1 {
            return Err(EnvelopeError::NonPositiveSeq(seq));
        }

        let cmd = match self.cmd {
            None => return Err(EnvelopeError::MissingCmd),
            Some(Value::Array(items)) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(name) => names.push(name),
                        _ => return Err(EnvelopeError::CmdNotAList),
                    }
                }
                names
            }
            Some(_) => return Err(EnvelopeError::CmdNotAList),
        };

        if cmd.len() as i64 != seq {
            warn!(
                seq,
                commands = cmd.len(),
                "`seq` does not match the number of commands, using the command list"
            );
        }

        let args = normalize_args(self.args, cmd.len());

        Ok(Envelope {
            client_id,
            seq: cmd.len(),
            cmd,
            args,
        })
    }
}

/// Align `args` index-for-index with `cmd`, padding with `null`.
fn normalize_args(args: Option<Value>, len: usize) -> Vec<Value> {
    let mut entries = match args {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(
                args_type = json_type_name(&other),
                "`args` is not an array, treating all arguments as null"
            );
            Vec::new()
        }
    };
    if !entries.is_empty() && entries.len() != len {
        warn!(
            args = entries.len(),
            commands = len,
            "`args` does not align with `cmd`, padding with null"
        );
    }
    entries.resize(len, Value::Null);
    entries
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated command envelope, `args` aligned with `cmd`.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Device identity the envelope was addressed to.
    pub client_id: String,
    /// Number of atomic commands in the batch.
    pub seq: usize,
    /// Ordered command names.
    pub cmd: Vec<String>,
    /// Ordered arguments, one per command, `null` where absent.
    pub args: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_and_validate(payload: Value, own_id: &str) -> Result<Envelope, EnvelopeError> {
        let raw = RawEnvelope::decode(payload.to_string().as_bytes()).unwrap();
        raw.validate(own_id)
    }

    #[test]
    fn test_valid_envelope() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 2, "cmd": ["a", "b"], "args": [1, null]}),
            "dev-1",
        )
        .unwrap();

        assert_eq!(env.seq, 2);
        assert_eq!(env.cmd, vec!["a", "b"]);
        assert_eq!(env.args, vec![json!(1), Value::Null]);
    }

    #[test]
    fn test_not_json() {
        let err = RawEnvelope::decode(b"not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn test_missing_client_id() {
        let err = decode_and_validate(json!({"seq": 1, "cmd": ["a"]}), "dev-1").unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingClientId));
    }

    #[test]
    fn test_client_id_not_a_string() {
        let err =
            decode_and_validate(json!({"client_id": 7, "seq": 1, "cmd": ["a"]}), "dev-1")
                .unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingClientId));
    }

    #[test]
    fn test_client_id_mismatch() {
        let err = decode_and_validate(
            json!({"client_id": "other", "seq": 1, "cmd": ["a"]}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::ClientIdMismatch { .. }));
    }

    #[test]
    fn test_missing_seq() {
        let err =
            decode_and_validate(json!({"client_id": "dev-1", "cmd": ["a"]}), "dev-1").unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSeq));
    }

    #[test]
    fn test_seq_not_an_integer() {
        let err = decode_and_validate(
            json!({"client_id": "dev-1", "seq": "three", "cmd": ["a"]}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::SeqNotAnInteger));
    }

    #[test]
    fn test_non_positive_seq() {
        let err = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 0, "cmd": ["a"]}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::NonPositiveSeq(0)));

        let err = decode_and_validate(
            json!({"client_id": "dev-1", "seq": -3, "cmd": ["a"]}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::NonPositiveSeq(-3)));
    }

    #[test]
    fn test_missing_cmd() {
        let err =
            decode_and_validate(json!({"client_id": "dev-1", "seq": 1}), "dev-1").unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingCmd));
    }

    #[test]
    fn test_cmd_not_a_list() {
        let err = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 1, "cmd": "ping"}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::CmdNotAList));

        let err = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 2, "cmd": ["ping", 42]}),
            "dev-1",
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::CmdNotAList));
    }

    #[test]
    fn test_args_absent_padded_with_null() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 2, "cmd": ["a", "b"]}),
            "dev-1",
        )
        .unwrap();
        assert_eq!(env.args, vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_args_shorter_than_cmd_padded() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 3, "cmd": ["a", "b", "c"], "args": [1]}),
            "dev-1",
        )
        .unwrap();
        assert_eq!(env.args, vec![json!(1), Value::Null, Value::Null]);
    }

    #[test]
    fn test_args_longer_than_cmd_truncated() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 1, "cmd": ["a"], "args": [1, 2, 3]}),
            "dev-1",
        )
        .unwrap();
        assert_eq!(env.args, vec![json!(1)]);
    }

    #[test]
    fn test_args_not_an_array_treated_as_null() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 1, "cmd": ["a"], "args": "oops"}),
            "dev-1",
        )
        .unwrap();
        assert_eq!(env.args, vec![Value::Null]);
    }

    #[test]
    fn test_seq_cmd_mismatch_uses_cmd_length() {
        let env = decode_and_validate(
            json!({"client_id": "dev-1", "seq": 5, "cmd": ["a", "b"]}),
            "dev-1",
        )
        .unwrap();
        assert_eq!(env.seq, 2);
        assert_eq!(env.cmd.len(), 2);
    }

    #[test]
    fn test_carried_id() {
        let raw = RawEnvelope::decode(
            json!({"sequence_id": "topic-abc", "pong": true})
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(raw.carried_id(), Some("topic-abc"));

        let raw = RawEnvelope::decode(
            json!({"client_id": "dev-1", "seq": 1, "cmd": ["a"]})
                .to_string()
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(raw.carried_id(), None);
    }
}
