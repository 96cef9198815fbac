//! `ai_action` — category `ai`.
//!
//! Lets a workflow author describe an intent in English instead of a
//! selector and have the hybrid locator plus a small set of primitive
//! sub-actions (click/type) carry it out. Each primitive step is
//! recorded via `context.record_action` so an out-of-scope workflow
//! editor can later convert this into a deterministic selector-based
//! node.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::config::{opt_u64, require_str};
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::traits::ExecutableNode;

const DEFAULT_LOCATE_TIMEOUT_MS: u64 = 10_000;

pub struct AiActionNode;

#[async_trait]
impl ExecutableNode for AiActionNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let intent = require_str(&config, "intent")?;
        let kind = config.get("action").and_then(Value::as_str).unwrap_or("click").to_string();
        let timeout_ms = opt_u64(&config, "timeout_ms", DEFAULT_LOCATE_TIMEOUT_MS);

        let page = ctx.page().await;
        let location = ctx.locator.locate(&page, &intent, None, true, timeout_ms).await?;

        match kind.as_str() {
            "click" => {
                ctx.driver().click(&page, &location.selector).await?;
                ctx.record_action("click", json!({ "selector": location.selector, "intent": intent }));
            }
            "type" => {
                let text = require_str(&config, "text")?;
                ctx.driver().type_text(&page, &location.selector, &text).await?;
                ctx.record_action(
                    "type",
                    json!({ "selector": location.selector, "intent": intent, "length": text.len() }),
                );
            }
            other => return Err(NodeError::Fatal(format!("unsupported ai_action kind `{other}`"))),
        }

        Ok(json!({
            "effective_selector": location.selector,
            "confidence": location.confidence,
            "reasoning": location.reasoning,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NullChannel;
    use browser::mock::MockDriver;
    use browser::{BrowserDriver, FallbackStrategy, HybridLocator, PageId};
    use std::sync::Arc;

    #[tokio::test]
    async fn click_intent_resolves_and_records_the_step() {
        let driver = Arc::new(MockDriver::new());
        driver.set_fallback_match(FallbackStrategy::RoleButton, 1, "#real-submit");
        let driver: Arc<dyn BrowserDriver> = driver;
        let locator = HybridLocator::new(driver.clone(), None);
        let ctx = ExecutionContext::new(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            driver,
            PageId("p1".into()),
            locator,
            None,
            Arc::new(NullChannel),
            None,
            false,
            false,
            true,
        );

        let result = AiActionNode.execute(&ctx, "n1", json!({"intent": "Submit the form", "action": "click"})).await.unwrap();
        assert_eq!(result["effective_selector"], "#real-submit");
        assert_eq!(ctx.recorded_actions().len(), 1);
    }
}
