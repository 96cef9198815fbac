//! Data-handling actions, category `data`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::browser_actions::locate_target;
use crate::actions::config::require_str;
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::traits::ExecutableNode;

/// Extracts text from a located element and sets it as `context.clipboard`
/// — the single last-extracted string a run carries forward.
pub struct ExtractTextNode;

#[async_trait]
impl ExecutableNode for ExtractTextNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let (authored, effective) = locate_target(ctx, &config).await?;
        let page = ctx.page().await;
        let text = ctx.driver().extract_text(&page, &effective).await?;
        *ctx.clipboard.write().await = Some(text.clone());
        Ok(json!({ "text": text, "selector": authored, "effective_selector": effective }))
    }
}

/// Writes an explicit value into `context.clipboard`, supplementing
/// `extract_text`'s implicit write.
pub struct CopyToClipboardNode;

#[async_trait]
impl ExecutableNode for CopyToClipboardNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let text = require_str(&config, "text")?;
        *ctx.clipboard.write().await = Some(text.clone());
        Ok(json!({ "clipboard": text }))
    }
}

/// Reads `context.clipboard`; if `selector` is given, types it into that
/// element (locating/healing like `input_text`), otherwise just returns
/// the value for a downstream `set_variable`.
pub struct PasteFromClipboardNode;

#[async_trait]
impl ExecutableNode for PasteFromClipboardNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let value = ctx.clipboard.read().await.clone().unwrap_or_default();

        if config.get("selector").is_some() {
            let (authored, effective) = locate_target(ctx, &config).await?;
            let page = ctx.page().await;
            ctx.driver().type_text(&page, &effective, &value).await?;
            return Ok(json!({ "clipboard": value, "selector": authored, "effective_selector": effective }));
        }

        Ok(json!({ "clipboard": value }))
    }
}

/// Sets a named variable in `context.variables` for later interpolation.
pub struct SetVariableNode;

#[async_trait]
impl ExecutableNode for SetVariableNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let name = require_str(&config, "name")?;
        let value = config.get("value").cloned().unwrap_or(Value::Null);
        ctx.variables.write().await.insert(name.clone(), value.clone());
        Ok(json!({ name: value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NullChannel;
    use browser::mock::MockDriver;
    use browser::{BrowserDriver, HybridLocator, PageId};
    use std::sync::Arc;

    fn make_ctx(driver: Arc<dyn BrowserDriver>) -> ExecutionContext {
        let locator = HybridLocator::new(driver.clone(), None);
        ExecutionContext::new(
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
        )
    }

    #[tokio::test]
    async fn set_variable_is_visible_to_later_reads() {
        let ctx = make_ctx(Arc::new(MockDriver::new()));
        SetVariableNode.execute(&ctx, "n1", json!({"name": "q", "value": "hello"})).await.unwrap();
        assert_eq!(ctx.variables.read().await.get("q"), Some(&Value::String("hello".into())));
    }

    #[tokio::test]
    async fn extract_text_populates_clipboard() {
        let driver = Arc::new(MockDriver::new());
        driver.set_selector_visible("#price", 1);
        driver.set_extracted_text("#price", "9.99");
        let ctx = make_ctx(driver);

        let result = ExtractTextNode.execute(&ctx, "n1", json!({"selector": "#price"})).await.unwrap();
        assert_eq!(result["text"], "9.99");
        assert_eq!(ctx.clipboard.read().await.as_deref(), Some("9.99"));
    }

    #[tokio::test]
    async fn copy_then_paste_round_trips_through_clipboard() {
        let ctx = make_ctx(Arc::new(MockDriver::new()));
        CopyToClipboardNode.execute(&ctx, "n1", json!({"text": "hi"})).await.unwrap();
        let result = PasteFromClipboardNode.execute(&ctx, "n2", json!({})).await.unwrap();
        assert_eq!(result["clipboard"], "hi");
    }
}
