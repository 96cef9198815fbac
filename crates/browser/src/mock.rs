//! Test doubles for [`BrowserDriver`], used across this crate's unit tests
//! and re-exported for `engine`'s scheduler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::driver::{BrowserDriver, FallbackStrategy, MarkedElement, PageId, StorageState};
use crate::error::DriverError;

struct MockPage {
    id: String,
    blank: bool,
    closed: bool,
}

#[derive(Default)]
struct State {
    debug_endpoint: Option<String>,
    pages: Vec<MockPage>,
    browser_closed: bool,
    custom_context_closed: bool,
    next_page_seq: u32,
    /// Selector -> visible count, for `wait_visible`/validation tests.
    selector_visibility: Vec<(String, usize)>,
    /// Fallback strategy -> (match_count, synthesized selector).
    fallback_matches: Vec<(FallbackStrategy, usize, String)>,
    set_of_mark: Vec<MarkedElement>,
    navigated: Vec<(PageId, String)>,
    clicked: Vec<(PageId, String)>,
    typed: Vec<(PageId, String, String)>,
    extracted_text: Vec<(String, String)>,
}

/// Scriptable fake of a real browser driver.
pub struct MockDriver {
    state: Mutex<State>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    pub fn with_debug_endpoint(endpoint: &str) -> Self {
        let mut state = State::default();
        state.debug_endpoint = Some(endpoint.to_string());
        Self { state: Mutex::new(state) }
    }

    pub fn push_page(&self, id: &str, blank: bool) {
        self.state.lock().unwrap().pages.push(MockPage { id: id.to_string(), blank, closed: false });
    }

    pub fn page_closed(&self, page: &PageId) -> bool {
        self.state.lock().unwrap().pages.iter().find(|p| p.id == page.0).map(|p| p.closed).unwrap_or(true)
    }

    pub fn browser_closed(&self) -> bool {
        self.state.lock().unwrap().browser_closed
    }

    pub fn custom_context_closed(&self) -> bool {
        self.state.lock().unwrap().custom_context_closed
    }

    pub fn set_selector_visible(&self, selector: &str, count: usize) {
        self.state.lock().unwrap().selector_visibility.push((selector.to_string(), count));
    }

    pub fn set_fallback_match(&self, strategy: FallbackStrategy, count: usize, selector: &str) {
        self.state.lock().unwrap().fallback_matches.push((strategy, count, selector.to_string()));
    }

    pub fn set_set_of_mark(&self, elements: Vec<MarkedElement>) {
        self.state.lock().unwrap().set_of_mark = elements;
    }

    pub fn set_extracted_text(&self, selector: &str, text: &str) {
        self.state.lock().unwrap().extracted_text.push((selector.to_string(), text.to_string()));
    }

    pub fn navigated_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().navigated.iter().map(|(_, u)| u.clone()).collect()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.iter().map(|(_, s)| s.clone()).collect()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn probe_debug_endpoint(&self, candidates: &[String]) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.debug_endpoint.clone().filter(|e| candidates.contains(e))
    }

    async fn connect_over_cdp(&self, _endpoint: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn launch(&self, _headless: bool) -> Result<(), DriverError> {
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageId>, DriverError> {
        Ok(self.state.lock().unwrap().pages.iter().map(|p| PageId(p.id.clone())).collect())
    }

    async fn is_blank(&self, page: &PageId) -> Result<bool, DriverError> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .iter()
            .find(|p| p.id == page.0)
            .map(|p| p.blank)
            .ok_or_else(|| DriverError::new("unknown page"))
    }

    async fn new_page_in_current_context(&self) -> Result<PageId, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.next_page_seq += 1;
        let id = format!("created-{}", state.next_page_seq);
        state.pages.push(MockPage { id: id.clone(), blank: true, closed: false });
        Ok(PageId(id))
    }

    async fn new_page_from_storage_state(&self, _storage_state: &StorageState) -> Result<PageId, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.next_page_seq += 1;
        let id = format!("restored-{}", state.next_page_seq);
        state.pages.push(MockPage { id: id.clone(), blank: true, closed: false });
        Ok(PageId(id))
    }

    async fn close_page(&self, page: &PageId) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if let Some(p) = state.pages.iter_mut().find(|p| p.id == page.0) {
            p.closed = true;
        }
        Ok(())
    }

    async fn close_custom_context(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().custom_context_closed = true;
        Ok(())
    }

    async fn close_browser(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().browser_closed = true;
        Ok(())
    }

    async fn export_storage_state(&self) -> Result<StorageState, DriverError> {
        Ok(json!({"cookies": [], "origins": []}))
    }

    async fn screenshot_jpeg_base64(&self, _page: &PageId) -> Result<String, DriverError> {
        Ok("ZmFrZS1qcGVn".to_string())
    }

    async fn navigate(&self, page: &PageId, url: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().navigated.push((page.clone(), url.to_string()));
        Ok(())
    }

    async fn wait_visible(&self, _page: &PageId, selector: &str, _timeout_ms: u64) -> Result<usize, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .selector_visibility
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, c)| *c)
            .unwrap_or(0))
    }

    async fn click(&self, page: &PageId, selector: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().clicked.push((page.clone(), selector.to_string()));
        Ok(())
    }

    async fn type_text(&self, page: &PageId, selector: &str, text: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().typed.push((page.clone(), selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn extract_text(&self, _page: &PageId, selector: &str) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        state
            .extracted_text
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| DriverError::new(format!("no text configured for {selector}")))
    }

    async fn fallback_count(&self, _page: &PageId, strategy: FallbackStrategy, _target: &str) -> Result<usize, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state.fallback_matches.iter().find(|(s, _, _)| *s == strategy).map(|(_, c, _)| *c).unwrap_or(0))
    }

    async fn fallback_selector(&self, _page: &PageId, strategy: FallbackStrategy, _target: &str) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        state
            .fallback_matches
            .iter()
            .find(|(s, _, _)| *s == strategy)
            .map(|(_, _, sel)| sel.clone())
            .ok_or_else(|| DriverError::new("no fallback match configured"))
    }

    async fn set_of_mark_snapshot(&self, _page: &PageId) -> Result<Vec<MarkedElement>, DriverError> {
        Ok(self.state.lock().unwrap().set_of_mark.clone())
    }

    fn is_target_closed(&self, err: &DriverError) -> bool {
        err.0.contains("Target closed") || err.0.contains("target closed")
    }
}
