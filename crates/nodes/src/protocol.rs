//! Bidirectional streaming protocol.
//!
//! Defined here rather than in the `streaming` crate so both `nodes`
//! (whose `ExecutionContext` emits these directly) and `engine` (whose
//! scheduler emits the rest) can construct them without depending on a
//! transport. `streaming` re-exports these types over its concrete
//! channel implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::NodeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Connected {
        execution_id: String,
    },
    ExecutionStarted {
        execution_id: String,
        workflow_id: String,
        node_order: Vec<String>,
    },
    NodeStart {
        node_id: String,
        node_type: String,
    },
    NodeComplete {
        node_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        record: NodeRecord,
    },
    Screenshot {
        node_id: String,
        data: String,
        timestamp: String,
    },
    Log {
        timestamp: String,
        level: LogLevel,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        message: String,
    },
    UserInputRequired {
        node_id: String,
        prompt: String,
        timeout: u64,
    },
    AiInterventionRequired {
        node_id: String,
        node_type: String,
        intervention_type: String,
        reason: String,
        confidence: f32,
        screenshot: String,
    },
    SelectorUpdate {
        node_id: String,
        selector: String,
    },
    StorageStateUpdate {
        data: Value,
    },
    ExecutionComplete {
        execution_id: String,
        success: bool,
        duration: u64,
        logs: Vec<LogEntry>,
    },
    ExecutionCancelled {
        execution_id: String,
    },
    DebugLocatorResult {
        node_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Headless,
    Headed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInputAction {
    Continue,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundControl {
    StartExecution {
        workflow_id: String,
        mode: ExecutionMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        injected_storage_state: Option<Value>,
    },
    UserInputResponse {
        action: UserInputAction,
        node_id: String,
    },
    StopExecution,
    LoginConfirmed,
    DebugAiLocator {
        node_id: String,
        target_description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        saved_selector: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_events_tag_by_snake_case_type() {
        let ev = OutboundEvent::Connected { execution_id: "e1".into() };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "connected");
        assert_eq!(v["execution_id"], "e1");
    }

    #[test]
    fn inbound_start_execution_round_trips() {
        let raw = r#"{"type":"start_execution","workflow_id":"w1","mode":"headless"}"#;
        let parsed: InboundControl = serde_json::from_str(raw).unwrap();
        match parsed {
            InboundControl::StartExecution { workflow_id, mode, injected_storage_state } => {
                assert_eq!(workflow_id, "w1");
                assert_eq!(mode, ExecutionMode::Headless);
                assert!(injected_storage_state.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn debug_ai_locator_round_trips() {
        let raw = r##"{"type":"debug_ai_locator","node_id":"n1","target_description":"Submit","saved_selector":"#stale"}"##;
        let parsed: InboundControl = serde_json::from_str(raw).unwrap();
        assert!(matches!(parsed, InboundControl::DebugAiLocator { .. }));
    }
}
