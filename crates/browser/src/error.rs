//! Error types for browser session management and element location.

use thiserror::Error;

/// Errors surfaced by a [`crate::driver::BrowserDriver`] implementation.
///
/// The core never inspects driver-specific error text directly; instead
/// `BrowserDriver::is_target_closed` classifies a `DriverError` as a
/// cancellation signal or a fatal node error.
#[derive(Debug, Error, Clone)]
#[error("driver error: {0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from the session manager's connect/cleanup lifecycle.
#[derive(Debug, Error)]
pub enum BrowserConnectionError {
    #[error("failed to attach to an existing browser: {0}")]
    AttachFailed(DriverError),

    #[error("failed to launch a browser: {0}")]
    LaunchFailed(DriverError),

    #[error("both attach and launch failed: attach={attach}, launch={launch}")]
    BothFailed {
        attach: DriverError,
        launch: DriverError,
    },
}

/// Errors from the hybrid element locator.
#[derive(Debug, Error, Clone)]
pub enum LocationError {
    #[error("no saved selector and AI fallback disabled for target '{0}'")]
    NoStrategyAvailable(String),

    #[error("AI locator unavailable: {0}")]
    LlmUnavailable(String),

    #[error("exhausted all location strategies for '{target}'")]
    Exhausted {
        target: String,
        /// Base64-encoded JPEG captured for debugging, best-effort.
        debug_screenshot: Option<String>,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Errors from LLM-backed calls (locator AI path, intervention detector).
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("LLM call timed out")]
    Timeout,

    #[error("LLM rate limited")]
    RateLimited,

    #[error("LLM returned malformed JSON: {0}")]
    MalformedJson(String),

    #[error("LLM transport error: {0}")]
    Transport(String),

    #[error("no LLM client configured")]
    Unconfigured,
}
