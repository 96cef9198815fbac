//! Flow-control actions, category `control`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::browser_actions::locate_target;
use crate::actions::config::{opt_str, opt_u64};
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::traits::ExecutableNode;

const DEFAULT_USER_INPUT_TIMEOUT_SECS: u64 = 300;
const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed delay, cancellable at `CANCELLATION_POLL_INTERVAL` granularity —
/// every suspension point must surface cancellation within one checkpoint
/// of the stop signal.
pub struct WaitNode;

#[async_trait]
impl ExecutableNode for WaitNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let seconds = config.get("seconds").and_then(Value::as_f64).unwrap_or(0.0).max(0.0);
        let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(seconds);

        loop {
            ctx.check_cancelled()?;
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep((deadline - now).min(CANCELLATION_POLL_INTERVAL)).await;
        }
        ctx.check_cancelled()?;
        Ok(json!({ "waited_seconds": seconds }))
    }
}

/// Locates without acting — a pure synchronization node distinct from
/// `wait(seconds)`.
pub struct WaitForElementNode;

#[async_trait]
impl ExecutableNode for WaitForElementNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let (authored, effective) = locate_target(ctx, &config).await?;
        Ok(json!({ "selector": authored, "effective_selector": effective }))
    }
}

/// Pauses the run for a human response. `on_timeout` defaults to `fail`;
/// a node may opt into `continue` instead.
pub struct UserInputNode;

#[async_trait]
impl ExecutableNode for UserInputNode {
    async fn execute(&self, ctx: &ExecutionContext, node_id: &str, config: Value) -> Result<Value, NodeError> {
        let prompt = opt_str(&config, "prompt").unwrap_or_default();
        let timeout_secs = opt_u64(&config, "timeout_seconds", DEFAULT_USER_INPUT_TIMEOUT_SECS);
        let on_timeout = opt_str(&config, "on_timeout").unwrap_or_else(|| "fail".to_string());

        match ctx.request_user_input(node_id, &prompt, Duration::from_secs(timeout_secs)).await {
            Ok(()) => Ok(json!({ "response": "continue" })),
            Err(NodeError::UserInputTimeout) if on_timeout == "continue" => {
                Ok(json!({ "response": "timeout_continue" }))
            }
            Err(e) => Err(e),
        }
    }
}
