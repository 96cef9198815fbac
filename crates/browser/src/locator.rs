//! Hybrid element locator.
//!
//! Strategy order: saved CSS selector, set-of-mark AI pass, deterministic
//! fallback chain, reshaped around an explicit `BrowserDriver` boundary
//! instead of talking to a browser automation library directly.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::driver::{BrowserDriver, FallbackStrategy, MarkedElement, PageId};
use crate::error::LocationError;
use crate::llm::{parse_json_response, ChatMessage, LlmClient};

const AI_CONFIDENCE_FLOOR: f32 = 0.1;
const AI_VALIDATE_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationMethod {
    Css,
    Ai,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct LocationResult {
    pub selector: String,
    pub confidence: f32,
    pub method: LocationMethod,
    pub reasoning: String,
}

#[derive(Debug, Deserialize)]
struct AiLocateResponse {
    mark_id: Option<u32>,
    selector: Option<String>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    alternatives: Vec<String>,
}

pub struct HybridLocator {
    driver: Arc<dyn BrowserDriver>,
    llm: Option<Arc<dyn LlmClient>>,
}

impl HybridLocator {
    pub fn new(driver: Arc<dyn BrowserDriver>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { driver, llm }
    }

    #[instrument(skip(self), fields(%target_description))]
    pub async fn locate(
        &self,
        page: &PageId,
        target_description: &str,
        saved_selector: Option<&str>,
        enable_ai_fallback: bool,
        timeout_ms: u64,
    ) -> Result<LocationResult, LocationError> {
        if let Some(selector) = saved_selector {
            if self.driver.wait_visible(page, selector, timeout_ms).await? >= 1 {
                info!(%selector, "saved selector still valid");
                return Ok(LocationResult {
                    selector: selector.to_string(),
                    confidence: 1.0,
                    method: LocationMethod::Css,
                    reasoning: "saved selector resolved to a visible element".into(),
                });
            }
            warn!(%selector, "saved selector no longer resolves");
        }

        if enable_ai_fallback {
            if let Some(result) = self.try_ai(page, target_description).await {
                return Ok(result);
            }
        }

        if let Some(result) = self.try_fallback_strategies(page, target_description).await? {
            return Ok(result);
        }

        let debug_screenshot = self.driver.screenshot_jpeg_base64(page).await.ok();
        Err(LocationError::Exhausted { target: target_description.to_string(), debug_screenshot })
    }

    async fn try_ai(&self, page: &PageId, target_description: &str) -> Option<LocationResult> {
        let llm = self.llm.clone()?;

        let marks = match self.driver.set_of_mark_snapshot(page).await {
            Ok(m) if !m.is_empty() => m,
            Ok(_) => {
                warn!("set-of-mark snapshot was empty");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to capture set-of-mark snapshot");
                return None;
            }
        };

        let prompt = build_ai_prompt(target_description, &marks);
        let response_text = match llm.complete(vec![ChatMessage::user_text(prompt)]).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "LLM call failed, falling back");
                return None;
            }
        };

        let parsed: AiLocateResponse = match parse_json_response(&response_text).and_then(|v| {
            serde_json::from_value(v).map_err(|e| crate::error::LlmError::MalformedJson(e.to_string()))
        }) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not parse AI locator response");
                return None;
            }
        };

        if parsed.confidence < AI_CONFIDENCE_FLOOR {
            warn!(confidence = parsed.confidence, "AI locator confidence below floor");
            return None;
        }

        // The returned selector is tried first, but its `mark_id` is
        // authoritative: if the free-form selector fails to validate, the
        // pre-computed selector for that mark is tried next, then each
        // alternative in order.
        let mut candidates: Vec<String> = Vec::new();
        if let Some(sel) = &parsed.selector {
            candidates.push(sel.clone());
        }
        if let Some(mark_id) = parsed.mark_id {
            if let Some(marked) = marks.iter().find(|m| m.mark == mark_id) {
                candidates.push(marked.selector.clone());
            }
        }
        candidates.extend(parsed.alternatives.iter().cloned());

        for candidate in candidates {
            match self.driver.wait_visible(page, &candidate, AI_VALIDATE_TIMEOUT_MS).await {
                Ok(n) if n >= 1 => {
                    info!(selector = %candidate, confidence = parsed.confidence, "AI locator resolved");
                    return Some(LocationResult {
                        selector: candidate,
                        confidence: parsed.confidence,
                        method: LocationMethod::Ai,
                        reasoning: parsed.reasoning.clone(),
                    });
                }
                _ => continue,
            }
        }

        warn!("no AI-suggested candidate validated");
        None
    }

    async fn try_fallback_strategies(
        &self,
        page: &PageId,
        target_description: &str,
    ) -> Result<Option<LocationResult>, LocationError> {
        for strategy in FallbackStrategy::ORDER {
            let count = self.driver.fallback_count(page, strategy, target_description).await?;
            if count >= 1 {
                let selector = self.driver.fallback_selector(page, strategy, target_description).await?;
                info!(?strategy, %selector, "deterministic fallback matched");
                return Ok(Some(LocationResult {
                    selector,
                    confidence: 0.6,
                    method: LocationMethod::Fallback,
                    reasoning: format!("matched via deterministic fallback strategy {strategy:?}"),
                }));
            }
        }
        Ok(None)
    }
}

fn build_ai_prompt(target_description: &str, marks: &[MarkedElement]) -> String {
    let mut lines = String::new();
    for m in marks {
        let text = m.text.as_deref().unwrap_or("");
        lines.push_str(&format!("[{}] <{} role={}> \"{}\"\n", m.mark, m.tag, m.role, text));
    }

    format!(
        "You are a web automation assistant. Given a numbered list of visible, \
interactive elements on a page, find the one that best matches the target \
description.\n\nTarget: \"{target_description}\"\n\nElements:\n{lines}\n\
Respond with a single JSON object: {{\"mark_id\": <int or null>, \"selector\": \
\"<css selector>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<short reason>\", \
\"alternatives\": [\"<css selector>\", ...]}}. If nothing matches, set mark_id \
to null and confidence to 0."
    )
}
