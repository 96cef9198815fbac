//! AI intervention detector.
//!
//! A vision LLM call classifying a screenshot, defaulting to "needs
//! intervention" on any failure (safety-first) or low confidence.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::llm::{parse_json_response, ChatMessage, LlmClient};

const SYSTEM_PROMPT: &str = "You are a web automation safety monitor. Given a \
screenshot of a web page, decide whether a human needs to intervene before \
automation continues. Look for: a login form, a CAPTCHA, a pop-up (cookie \
banner, ad, privacy notice), or a security confirmation dialog. Respond with \
a single JSON object: {\"needs_intervention\": true|false, \"intervention_type\": \
\"login-form\"|\"captcha\"|\"popup\"|\"security-confirm\"|\"other\"|\"none\", \
\"confidence\": <0.0-1.0>, \"reason\": \"<short reason>\"}. Return only JSON.";

/// Confidence below this threshold is treated as "needs intervention"
/// regardless of what the model classified.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterventionType {
    LoginForm,
    Captcha,
    Popup,
    SecurityConfirm,
    Other,
    None,
}

impl InterventionType {
    fn parse(s: &str) -> Self {
        match s {
            "login-form" => Self::LoginForm,
            "captcha" => Self::Captcha,
            "popup" => Self::Popup,
            "security-confirm" => Self::SecurityConfirm,
            "none" => Self::None,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginForm => "login-form",
            Self::Captcha => "captcha",
            Self::Popup => "popup",
            Self::SecurityConfirm => "security-confirm",
            Self::Other => "other",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterventionVerdict {
    pub needs_intervention: bool,
    pub intervention_type: InterventionType,
    pub confidence: f32,
    pub reason: String,
}

impl InterventionVerdict {
    fn safe_default(reason: impl Into<String>) -> Self {
        Self {
            needs_intervention: true,
            intervention_type: InterventionType::Other,
            confidence: 0.5,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    needs_intervention: bool,
    #[serde(default)]
    intervention_type: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reason: String,
}

pub struct InterventionDetector {
    llm: Arc<dyn LlmClient>,
}

impl InterventionDetector {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn detect(&self, screenshot_jpeg_base64: &str) -> InterventionVerdict {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user_text_and_image(
                "Analyze this screenshot and decide whether intervention is needed.",
                screenshot_jpeg_base64,
            ),
        ];

        let response_text = match self.llm.complete(messages).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "intervention detector LLM call failed, defaulting to needs-intervention");
                return InterventionVerdict::safe_default(format!("detector call failed: {e}"));
            }
        };

        let raw: RawVerdict = match parse_json_response(&response_text)
            .and_then(|v| serde_json::from_value(v).map_err(|e| crate::error::LlmError::MalformedJson(e.to_string())))
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "could not parse intervention verdict, defaulting to needs-intervention");
                return InterventionVerdict::safe_default(format!("unparseable response: {e}"));
            }
        };

        let needs = raw.needs_intervention || raw.confidence < CONFIDENCE_THRESHOLD;
        info!(needs_intervention = needs, confidence = raw.confidence, "intervention verdict");

        InterventionVerdict {
            needs_intervention: needs,
            intervention_type: InterventionType::parse(&raw.intervention_type),
            confidence: raw.confidence,
            reason: raw.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedLlm(Result<String, crate::error::LlmError>);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, crate::error::LlmError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn detector_error_defaults_to_needs_intervention() {
        let llm = Arc::new(ScriptedLlm(Err(crate::error::LlmError::Timeout)));
        let detector = InterventionDetector::new(llm);
        let verdict = detector.detect("...").await;
        assert!(verdict.needs_intervention);
    }

    #[tokio::test]
    async fn low_confidence_forces_intervention_even_if_model_says_no() {
        let llm = Arc::new(ScriptedLlm(Ok(
            r#"{"needs_intervention": false, "intervention_type": "none", "confidence": 0.2, "reason": "looks fine"}"#
                .to_string(),
        )));
        let detector = InterventionDetector::new(llm);
        let verdict = detector.detect("...").await;
        assert!(verdict.needs_intervention);
    }

    #[tokio::test]
    async fn confident_no_intervention_is_trusted() {
        let llm = Arc::new(ScriptedLlm(Ok(
            r#"{"needs_intervention": false, "intervention_type": "none", "confidence": 0.95, "reason": "clean page"}"#
                .to_string(),
        )));
        let detector = InterventionDetector::new(llm);
        let verdict = detector.detect("...").await;
        assert!(!verdict.needs_intervention);
        assert_eq!(verdict.intervention_type, InterventionType::None);
    }

    #[tokio::test]
    async fn malformed_json_defaults_to_needs_intervention() {
        let llm = Arc::new(ScriptedLlm(Ok("not json".to_string())));
        let detector = InterventionDetector::new(llm);
        let verdict = detector.detect("...").await;
        assert!(verdict.needs_intervention);
    }
}
