//! `start` / `end` — the two reserved no-op node types, category `base`.
//! Both log and return an empty object.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::protocol::LogLevel;
use crate::traits::ExecutableNode;

pub struct StartNode;

#[async_trait]
impl ExecutableNode for StartNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, _config: Value) -> Result<Value, NodeError> {
        ctx.log(LogLevel::Info, "execution started", None).await;
        Ok(json!({}))
    }
}

pub struct EndNode;

#[async_trait]
impl ExecutableNode for EndNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, _config: Value) -> Result<Value, NodeError> {
        ctx.log(LogLevel::Info, "execution reached end node", None).await;
        Ok(json!({}))
    }
}
