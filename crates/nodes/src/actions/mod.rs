//! Built-in action implementations, grouped by category (`base`,
//! `browser`, `data`, `control`, `ai`).
//!
//! [`builtin_actions`] is the single entry point `engine::registry`
//! consumes to populate the process-wide registry at startup — an
//! explicit call rather than a decorator-style registration, since there
//! is no decorator mechanism in Rust.

pub mod ai;
pub mod base;
pub mod browser_actions;
pub mod config;
pub mod control;
pub mod data;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::traits::ExecutableNode;

/// Declarative metadata + executor for one action kind, minus an
/// `inputs`/`outputs` port list — every action here uses the single
/// `flow` port, so it's fixed rather than carried per-entry.
pub struct ActionSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub parameters: Value,
    pub node: Arc<dyn ExecutableNode>,
}

/// Every built-in action, in registration order. `engine::registry`
/// folds this into its `name -> ActionDefinition` map at process init.
pub fn builtin_actions() -> Vec<ActionSpec> {
    vec![
        ActionSpec {
            name: "start",
            label: "Start",
            description: "Marks the beginning of a workflow run.",
            category: "base",
            parameters: json!({}),
            node: Arc::new(base::StartNode),
        },
        ActionSpec {
            name: "end",
            label: "End",
            description: "Marks the end of a workflow run.",
            category: "base",
            parameters: json!({}),
            node: Arc::new(base::EndNode),
        },
        ActionSpec {
            name: "open_tab",
            label: "Open Tab",
            description: "Opens a new page in the current browser context and makes it current.",
            category: "browser",
            parameters: json!({}),
            node: Arc::new(browser_actions::OpenTabNode),
        },
        ActionSpec {
            name: "navigate",
            label: "Navigate",
            description: "Navigates the current page to a URL.",
            category: "browser",
            parameters: json!({ "url": { "type": "string", "required": true } }),
            node: Arc::new(browser_actions::NavigateNode),
        },
        ActionSpec {
            name: "click",
            label: "Click",
            description: "Clicks an element, healing a stale selector via the hybrid locator.",
            category: "browser",
            parameters: json!({
                "selector": { "type": "string", "required": true },
                "ai_target": { "type": "string", "required": false },
                "timeout_ms": { "type": "number", "required": false },
            }),
            node: Arc::new(browser_actions::ClickNode),
        },
        ActionSpec {
            name: "input_text",
            label: "Input Text",
            description: "Types text into an element, healing a stale selector via the hybrid locator.",
            category: "browser",
            parameters: json!({
                "selector": { "type": "string", "required": true },
                "text": { "type": "string", "required": true },
                "ai_target": { "type": "string", "required": false },
            }),
            node: Arc::new(browser_actions::InputTextNode),
        },
        ActionSpec {
            name: "screenshot",
            label: "Screenshot",
            description: "Captures and streams a screenshot of the current page.",
            category: "browser",
            parameters: json!({}),
            node: Arc::new(browser_actions::ScreenshotNode),
        },
        ActionSpec {
            name: "wait",
            label: "Wait",
            description: "Pauses for a fixed number of seconds, cancellable.",
            category: "control",
            parameters: json!({ "seconds": { "type": "number", "required": true } }),
            node: Arc::new(control::WaitNode),
        },
        ActionSpec {
            name: "wait_for_element",
            label: "Wait For Element",
            description: "Locates a target without acting on it.",
            category: "control",
            parameters: json!({
                "selector": { "type": "string", "required": true },
                "ai_target": { "type": "string", "required": false },
            }),
            node: Arc::new(control::WaitForElementNode),
        },
        ActionSpec {
            name: "user_input",
            label: "User Input",
            description: "Pauses the run and waits for a human response.",
            category: "control",
            parameters: json!({
                "prompt": { "type": "string", "required": true },
                "timeout_seconds": { "type": "number", "required": false },
                "on_timeout": { "type": "string", "enum": ["fail", "continue"], "required": false },
            }),
            node: Arc::new(control::UserInputNode),
        },
        ActionSpec {
            name: "extract_text",
            label: "Extract Text",
            description: "Extracts text from an element into the clipboard.",
            category: "data",
            parameters: json!({
                "selector": { "type": "string", "required": true },
                "ai_target": { "type": "string", "required": false },
            }),
            node: Arc::new(data::ExtractTextNode),
        },
        ActionSpec {
            name: "copy_to_clipboard",
            label: "Copy To Clipboard",
            description: "Writes an explicit value into the clipboard.",
            category: "data",
            parameters: json!({ "text": { "type": "string", "required": true } }),
            node: Arc::new(data::CopyToClipboardNode),
        },
        ActionSpec {
            name: "paste_from_clipboard",
            label: "Paste From Clipboard",
            description: "Reads the clipboard, optionally typing it into an element.",
            category: "data",
            parameters: json!({ "selector": { "type": "string", "required": false } }),
            node: Arc::new(data::PasteFromClipboardNode),
        },
        ActionSpec {
            name: "set_variable",
            label: "Set Variable",
            description: "Sets a named variable for later interpolation.",
            category: "data",
            parameters: json!({
                "name": { "type": "string", "required": true },
                "value": { "required": true },
            }),
            node: Arc::new(data::SetVariableNode),
        },
        ActionSpec {
            name: "ai_action",
            label: "AI Action",
            description: "Describes an intent in English; the hybrid locator and a primitive carry it out.",
            category: "ai",
            parameters: json!({
                "intent": { "type": "string", "required": true },
                "action": { "type": "string", "enum": ["click", "type"], "required": false },
                "text": { "type": "string", "required": false },
            }),
            node: Arc::new(ai::AiActionNode),
        },
    ]
}
