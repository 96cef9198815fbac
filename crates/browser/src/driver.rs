//! The boundary the core asks of the real browser driver.
//!
//! Nothing in this crate talks CDP or Playwright directly — the actual
//! driver (out of scope for this specification) implements
//! [`BrowserDriver`] and is handed to [`crate::session::SessionManager`]
//! and [`crate::locator::HybridLocator`] as a trait object.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;

/// Opaque handle to a single browser page/tab, scoped to one driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(pub String);

/// An opaque blob of cookies and origin-scoped storage, carried verbatim.
///
/// The engine never inspects its contents; it only ever round-trips it
/// between `connect(storage_state)` and `export_storage_state()`.
pub type StorageState = Value;

/// One visible, interactive element in a set-of-mark projection, numbered
/// `[1..N]` for a single locator call. Mark ids are stable only within the
/// call that produced them — never cache them across calls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MarkedElement {
    pub mark: u32,
    pub role: String,
    pub tag: String,
    pub text: Option<String>,
    /// Pre-computed stable selector synthesized by the driver using the
    /// strict preference order: unique id, parent-anchored nth-child,
    /// `data-testid`, `name`, href suffix (links), tag+multi-class.
    pub selector: String,
}

/// Everything the core needs from a real browser driver.
///
/// Implementations own the actual browser/page objects; the core only
/// ever deals in [`PageId`] handles and plain data.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Probe a list of candidate debug-endpoint URLs, returning the first
    /// one that answers as a real browser debug endpoint.
    async fn probe_debug_endpoint(&self, candidates: &[String]) -> Option<String>;

    /// Attach to an already-running browser via its CDP debug endpoint.
    async fn connect_over_cdp(&self, endpoint: &str) -> Result<(), DriverError>;

    /// Launch a fresh, ephemeral browser process.
    async fn launch(&self, headless: bool) -> Result<(), DriverError>;

    /// List pages open in the currently attached/launched browser's
    /// default context.
    async fn list_pages(&self) -> Result<Vec<PageId>, DriverError>;

    /// Whether the given page is blank (about:blank / no navigation yet).
    async fn is_blank(&self, page: &PageId) -> Result<bool, DriverError>;

    /// Create a new page **inside the current context** — never opens a
    /// fresh context, which would drop any attached login state.
    async fn new_page_in_current_context(&self) -> Result<PageId, DriverError>;

    /// Materialize a fresh context from an injected storage-state blob and
    /// open one page in it. Only used in launch mode.
    async fn new_page_from_storage_state(
        &self,
        storage_state: &StorageState,
    ) -> Result<PageId, DriverError>;

    /// Close a single page the engine created (not the whole browser).
    async fn close_page(&self, page: &PageId) -> Result<(), DriverError>;

    /// Close a context the engine created for an injected storage state.
    async fn close_custom_context(&self) -> Result<(), DriverError>;

    /// Tear down the entire browser process (launch mode only).
    async fn close_browser(&self) -> Result<(), DriverError>;

    /// Snapshot the current context's cookies/storage for hand-back to
    /// the client.
    async fn export_storage_state(&self) -> Result<StorageState, DriverError>;

    /// Capture a JPEG screenshot, base64-encoded.
    async fn screenshot_jpeg_base64(&self, page: &PageId) -> Result<String, DriverError>;

    async fn navigate(&self, page: &PageId, url: &str) -> Result<(), DriverError>;

    /// Wait for `selector` to become visible, up to `timeout_ms`, and
    /// return how many matching elements are visible (0 on timeout).
    async fn wait_visible(
        &self,
        page: &PageId,
        selector: &str,
        timeout_ms: u64,
    ) -> Result<usize, DriverError>;

    async fn click(&self, page: &PageId, selector: &str) -> Result<(), DriverError>;

    async fn type_text(&self, page: &PageId, selector: &str, text: &str) -> Result<(), DriverError>;

    async fn extract_text(&self, page: &PageId, selector: &str) -> Result<String, DriverError>;

    /// Count of elements a deterministic fallback strategy matches
    /// (`by_role`, `by_text`, `by_placeholder`, `by_label`, attribute
    /// selectors). `strategy` names one of the fixed fallback kinds; the
    /// driver resolves it to its native locator API.
    async fn fallback_count(
        &self,
        page: &PageId,
        strategy: FallbackStrategy,
        target: &str,
    ) -> Result<usize, DriverError>;

    /// Synthesize a stable selector for the first match of a fallback
    /// strategy, once it's known to match at least one element.
    async fn fallback_selector(
        &self,
        page: &PageId,
        strategy: FallbackStrategy,
        target: &str,
    ) -> Result<String, DriverError>;

    /// Project the page's visible, interactive elements to a numbered
    /// set-of-mark list for the AI locator.
    async fn set_of_mark_snapshot(&self, page: &PageId) -> Result<Vec<MarkedElement>, DriverError>;

    /// Classify a driver error as "the target was closed out from under
    /// us" (the signal the executor treats as cancellation-in-flight
    /// rather than a fatal node error) versus anything else.
    fn is_target_closed(&self, err: &DriverError) -> bool;
}

/// The fixed, ordered set of deterministic locator fallback strategies.
/// First strategy yielding `>= 1` match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    RoleButton,
    RoleLink,
    RoleTextbox,
    RoleSearchbox,
    TextExact,
    TextFuzzy,
    Placeholder,
    Label,
    AriaLabel,
    Title,
    Name,
    DataTestId,
}

impl FallbackStrategy {
    /// Most-specific-first: role-based matches before fuzzy text, text
    /// before attribute scraping.
    pub const ORDER: [FallbackStrategy; 12] = [
        FallbackStrategy::RoleButton,
        FallbackStrategy::RoleLink,
        FallbackStrategy::RoleTextbox,
        FallbackStrategy::RoleSearchbox,
        FallbackStrategy::TextExact,
        FallbackStrategy::TextFuzzy,
        FallbackStrategy::Placeholder,
        FallbackStrategy::Label,
        FallbackStrategy::AriaLabel,
        FallbackStrategy::Title,
        FallbackStrategy::Name,
        FallbackStrategy::DataTestId,
    ];
}
