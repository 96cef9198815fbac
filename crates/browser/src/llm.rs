//! LLM client boundary shared by the hybrid locator's AI path and the
//! intervention detector, plus an OpenAI-chat-completions-compatible
//! `HttpLlmClient` for whichever process wires up an API key and base
//! URL — reading both from the environment, since there is no
//! config-file loader here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::LlmError;

/// One part of a (possibly multimodal) chat message.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    ImageBase64Jpeg(String),
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: "system", parts: vec![ContentPart::Text(text.into())] }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: "user", parts: vec![ContentPart::Text(text.into())] }
    }

    pub fn user_text_and_image(text: impl Into<String>, jpeg_base64: impl Into<String>) -> Self {
        Self {
            role: "user",
            parts: vec![ContentPart::Text(text.into()), ContentPart::ImageBase64Jpeg(jpeg_base64.into())],
        }
    }
}

/// A chat-completion-capable LLM client, vision-capable when the caller
/// sends an image part.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError>;
}

/// Chat-completions client talking to an OpenAI-compatible HTTP API.
/// `image_part` content is sent as a data-URL, which every OpenAI-style
/// vision endpoint we've targeted accepts.
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmClient {
    /// Reads `LLM_BASE_URL` (default `https://api.openai.com/v1`),
    /// `LLM_API_KEY` (required), and `LLM_MODEL` (default `gpt-4o-mini`)
    /// from the environment.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("LLM_API_KEY").map_err(|_| LlmError::Unconfigured)?;
        let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self::new(base_url, api_key, model))
    }

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build().unwrap_or_default();
        Self { http, base_url: base_url.into(), api_key: api_key.into(), model: model.into() }
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum WireContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Serialize)]
struct WireImageUrl {
    url: String,
}

fn to_wire(message: &ChatMessage) -> WireMessage {
    let content = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WireContentPart::Text { text: text.clone() },
            ContentPart::ImageBase64Jpeg(b64) => {
                WireContentPart::ImageUrl { image_url: WireImageUrl { url: format!("data:image/jpeg;base64,{b64}") } }
            }
        })
        .collect();
    WireMessage { role: message.role, content }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let body = CompletionRequest { model: self.model.clone(), messages: messages.iter().map(to_wire).collect() };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(LlmError::Transport(format!("HTTP {}", response.status())));
        }

        let payload: Value = response.json().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::MalformedJson("response has no choices[0].message.content".into()))
    }
}

/// Strip a leading/trailing fenced code block (``` or ```json) and any
/// prose around it, tolerating the common ways small models wrap JSON.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}

/// Parse a JSON object out of raw LLM text, tolerating fenced code blocks
/// and leading/trailing prose by locating the first `{` / last `}` pair.
pub fn parse_json_response(text: &str) -> Result<Value, LlmError> {
    let cleaned = strip_code_fences(text);
    if let Ok(v) = serde_json::from_str::<Value>(cleaned) {
        return Ok(v);
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => serde_json::from_str(&cleaned[s..=e])
            .map_err(|err| LlmError::MalformedJson(err.to_string())),
        _ => Err(LlmError::MalformedJson("no JSON object found in response".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_json_response(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn parses_fenced_json() {
        let v = parse_json_response("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn parses_json_with_surrounding_prose() {
        let v = parse_json_response("Sure, here you go:\n{\"a\": 1}\nHope that helps!").unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_json_response("not json at all").is_err());
    }

    #[test]
    fn text_message_serializes_to_a_single_text_part() {
        let wire = to_wire(&ChatMessage::user_text("hello"));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "hello");
    }

    #[test]
    fn image_message_serializes_to_a_data_url() {
        let wire = to_wire(&ChatMessage::user_text_and_image("what's this?", "Zm9v"));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/jpeg;base64,Zm9v");
    }

    #[test]
    fn from_env_without_an_api_key_is_unconfigured() {
        std::env::remove_var("LLM_API_KEY");
        assert!(matches!(HttpLlmClient::from_env(), Err(LlmError::Unconfigured)));
    }
}
