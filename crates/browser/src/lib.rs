//! `browser` crate — everything the core asks of a real browser driver:
//! session connection/reuse/cleanup policy, the hybrid element locator,
//! and the AI intervention detector. The actual driver (CDP/Playwright
//! equivalent) is out of scope; it only needs to implement
//! [`driver::BrowserDriver`].

pub mod driver;
pub mod error;
pub mod intervention;
pub mod llm;
pub mod locator;
pub mod session;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use driver::{BrowserDriver, FallbackStrategy, MarkedElement, PageId, StorageState};
pub use error::{BrowserConnectionError, DriverError, LlmError, LocationError};
pub use intervention::{InterventionDetector, InterventionType, InterventionVerdict};
pub use llm::{ChatMessage, HttpLlmClient, LlmClient};
pub use locator::{HybridLocator, LocationMethod, LocationResult};
pub use session::{ConnectOutcome, SessionManager};
