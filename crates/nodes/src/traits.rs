//! The `ExecutableNode` trait — the contract every action kind fulfils.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::NodeError;

/// Executes one node's resolved config against the shared execution
/// context and returns its JSON result.
///
/// Takes `&ExecutionContext`, not `&mut` — every field an action can
/// mutate (variables, clipboard, current page) lives behind interior
/// mutability, so concurrent actions across *different* executions never
/// contend on a lock that belongs to this one.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    async fn execute(&self, ctx: &ExecutionContext, node_id: &str, config: Value) -> Result<Value, NodeError>;
}
