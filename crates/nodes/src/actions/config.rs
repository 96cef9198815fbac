//! Small helpers for pulling typed fields out of a node's resolved
//! (already-interpolated) JSON config, with consistent `NodeError::Fatal`
//! messages on missing/malformed fields.

use serde_json::Value;

use crate::error::NodeError;

pub fn require_str(config: &Value, key: &str) -> Result<String, NodeError> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| NodeError::Fatal(format!("missing required string field `{key}`")))
}

pub fn opt_str(config: &Value, key: &str) -> Option<String> {
    config.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn opt_u64(config: &Value, key: &str, default: u64) -> u64 {
    config.get(key).and_then(Value::as_u64).unwrap_or(default)
}

pub fn opt_bool(config: &Value, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}
