//! `NodeRecord` / `ExecutionRecord`.
//!
//! `ExecutionRecord` is the terminal artifact `persistence` serializes;
//! `NodeRecord` is mutated exactly twice by the recorder (start, then
//! completion or failure).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotEntry {
    pub node_id: String,
    pub data: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub node_type: String,
    pub node_label: String,
    pub status: NodeStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_base64: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl NodeRecord {
    pub fn start(node_id: impl Into<String>, node_type: impl Into<String>, node_label: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            node_label: node_label.into(),
            status: NodeStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            result: Value::Null,
            error: None,
            screenshot_base64: None,
            logs: Vec::new(),
        }
    }

    /// Coerces a scalar result into `{value: ...}` so every node's
    /// output is representable as a JSON object.
    pub fn complete(&mut self, result: Value, logs: Vec<LogEntry>) {
        let now = Utc::now();
        self.status = NodeStatus::Completed;
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.result = coerce_to_map(result);
        self.logs = logs;
    }

    pub fn fail(&mut self, error: impl Into<String>, logs: Vec<LogEntry>) {
        let now = Utc::now();
        self.status = NodeStatus::Failed;
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.error = Some(error.into());
        self.logs = logs;
    }

}

fn coerce_to_map(v: Value) -> Value {
    match v {
        Value::Object(_) | Value::Null => v,
        scalar => serde_json::json!({ "value": scalar }),
    }
}

/// The run-level status `ExecutionRecord` is ever persisted with — always
/// terminal, since only a finished run gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub total_nodes: usize,
    pub completed_nodes: usize,
    pub failed_nodes: usize,
    pub node_records: Vec<NodeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_result_is_coerced_to_value_map() {
        let mut rec = NodeRecord::start("n1", "extract_text", "Extract");
        rec.complete(Value::String("hello".into()), vec![]);
        assert_eq!(rec.result, serde_json::json!({ "value": "hello" }));
        assert_eq!(rec.status, NodeStatus::Completed);
    }

    #[test]
    fn object_result_passes_through_unchanged() {
        let mut rec = NodeRecord::start("n1", "navigate", "Navigate");
        rec.complete(serde_json::json!({ "url": "https://x" }), vec![]);
        assert_eq!(rec.result, serde_json::json!({ "url": "https://x" }));
    }

    #[test]
    fn fail_sets_error_and_leaves_result_null() {
        let mut rec = NodeRecord::start("n1", "click", "Click");
        rec.fail("element not found", vec![]);
        assert_eq!(rec.status, NodeStatus::Failed);
        assert_eq!(rec.error.as_deref(), Some("element not found"));
        assert!(rec.result.is_null());
    }
}
