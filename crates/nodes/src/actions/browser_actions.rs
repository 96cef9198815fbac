//! Browser-interaction actions, category `browser`.
//!
//! `click`/`input_text` route through the hybrid locator so a stale
//! selector heals via AI/fallback before the driver call; `navigate` and
//! `open_tab` talk to the driver directly.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::config::{opt_bool, opt_str, opt_u64, require_str};
use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::traits::ExecutableNode;

const DEFAULT_LOCATE_TIMEOUT_MS: u64 = 10_000;

/// Opens a new page inside the current browser context and makes it the
/// execution's current page. Always opens fresh — its purpose is
/// deliberately starting a new tab, never reusing the existing one
/// (unlike the attach-mode connect policy).
pub struct OpenTabNode;

#[async_trait]
impl ExecutableNode for OpenTabNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, _config: Value) -> Result<Value, NodeError> {
        let page = ctx.driver().new_page_in_current_context().await?;
        ctx.set_page(page.clone()).await;
        Ok(json!({ "page": page.0 }))
    }
}

pub struct NavigateNode;

#[async_trait]
impl ExecutableNode for NavigateNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let url = require_str(&config, "url")?;
        let page = ctx.page().await;
        ctx.driver().navigate(&page, &url).await?;
        Ok(json!({ "url": url }))
    }
}

/// Shared by `click` and `input_text`: locates the target, healing a
/// stale selector via AI/fallback when `ai_target` is present, and
/// reports `effective_selector` so the scheduler can emit
/// `selector_update` when it differs from the authored selector.
pub(crate) async fn locate_target(
    ctx: &ExecutionContext,
    config: &Value,
) -> Result<(String, String), NodeError> {
    let selector = require_str(config, "selector")?;
    let ai_target = opt_str(config, "ai_target");
    let enable_ai = ai_target.is_some() || opt_bool(config, "enable_ai_fallback", false);
    let target_description = ai_target.unwrap_or_else(|| selector.clone());
    let timeout_ms = opt_u64(config, "timeout_ms", DEFAULT_LOCATE_TIMEOUT_MS);

    let page = ctx.page().await;
    let location = ctx.locator.locate(&page, &target_description, Some(&selector), enable_ai, timeout_ms).await?;
    Ok((selector, location.selector))
}

pub struct ClickNode;

#[async_trait]
impl ExecutableNode for ClickNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let (authored, effective) = locate_target(ctx, &config).await?;
        let page = ctx.page().await;
        ctx.driver().click(&page, &effective).await?;
        Ok(json!({ "selector": authored, "effective_selector": effective }))
    }
}

pub struct InputTextNode;

#[async_trait]
impl ExecutableNode for InputTextNode {
    async fn execute(&self, ctx: &ExecutionContext, _node_id: &str, config: Value) -> Result<Value, NodeError> {
        let text = require_str(&config, "text")?;
        let (authored, effective) = locate_target(ctx, &config).await?;
        let page = ctx.page().await;
        ctx.driver().type_text(&page, &effective, &text).await?;
        Ok(json!({ "selector": authored, "effective_selector": effective, "length": text.len() }))
    }
}

/// Explicit `screenshot` node — distinct from the executor's automatic
/// post-node capture; lets an authored workflow pin a screenshot at a
/// specific point regardless of whether the surrounding node succeeded.
pub struct ScreenshotNode;

#[async_trait]
impl ExecutableNode for ScreenshotNode {
    async fn execute(&self, ctx: &ExecutionContext, node_id: &str, _config: Value) -> Result<Value, NodeError> {
        ctx.send_screenshot(node_id).await;
        Ok(json!({}))
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
    async fn navigate_returns_interpolated_url() {
        let driver = Arc::new(MockDriver::new());
        let ctx = make_ctx(driver);
        let result = NavigateNode.execute(&ctx, "n1", json!({"url": "https://x/?q=hello"})).await.unwrap();
        assert_eq!(result["url"], "https://x/?q=hello");
    }

    #[tokio::test]
    async fn click_heals_stale_selector_and_reports_effective_selector() {
        let driver = Arc::new(MockDriver::new());
        driver.set_selector_visible("#stale", 0);
        driver.set_fallback_match(browser::FallbackStrategy::RoleButton, 1, "#real-submit");
        let ctx = make_ctx(driver);

        let result =
            ClickNode.execute(&ctx, "n1", json!({"selector": "#stale", "ai_target": "Submit"})).await.unwrap();
        assert_eq!(result["selector"], "#stale");
        assert_eq!(result["effective_selector"], "#real-submit");
    }

    #[tokio::test]
    async fn click_on_selector_with_no_match_anywhere_is_a_location_error() {
        let driver = Arc::new(MockDriver::new());
        driver.set_selector_visible("#nope", 0);
        let ctx = make_ctx(driver);

        let err = ClickNode.execute(&ctx, "n1", json!({"selector": "#nope"})).await.unwrap_err();
        assert!(matches!(err, NodeError::Location(_)));
    }
}
