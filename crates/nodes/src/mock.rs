//! `MockNode` — a test double for `ExecutableNode`.
//!
//! Useful in scheduler tests where a real action implementation is
//! either unavailable or irrelevant to what's being exercised.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::traits::ExecutableNode;

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with a fatal error.
    FailFatal(String),
    /// Fail as if the user cancelled mid-node.
    FailCancelled,
}

/// A mock node that records every config it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// Label used in test assertions.
    pub name: String,
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All configs seen by this node (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockNode {
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), behaviour: MockBehaviour::ReturnValue(value), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self { name: name.into(), behaviour: MockBehaviour::FailFatal(msg.into()), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing_cancelled(name: impl Into<String>) -> Self {
        Self { name: name.into(), behaviour: MockBehaviour::FailCancelled, calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, _ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        self.calls.lock().unwrap().push(config);

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(json!({ "node": self.name, "result": v })),
            MockBehaviour::FailFatal(msg) => Err(NodeError::Fatal(msg.clone())),
            MockBehaviour::FailCancelled => Err(NodeError::UserCancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returning_node_echoes_value_and_records_call() {
        let node = MockNode::returning("n1", json!({"x": 1}));
        let driver: std::sync::Arc<dyn browser::BrowserDriver> = std::sync::Arc::new(browser::mock::MockDriver::new());
        let locator = browser::HybridLocator::new(driver.clone(), None);
        let ctx = ExecutionContext::new(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            driver,
            browser::PageId("p1".into()),
            locator,
            None,
            std::sync::Arc::new(crate::channel::NullChannel),
            None,
            false,
            false,
            true,
        );

        let result = node.execute(&ctx, "n1", json!({"a": 1})).await.unwrap();
        assert_eq!(result["node"], "n1");
        assert_eq!(node.call_count(), 1);
    }
}
