//! Browser session manager — connection/reuse/cleanup policy.
//!
//! Attach to an already-running browser over its debug endpoint when one
//! is reachable (preserving whatever the user is already logged into),
//! otherwise launch an ephemeral one. Cleanup only ever tears down what
//! this manager itself created.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::driver::{BrowserDriver, PageId, StorageState};
use crate::error::{BrowserConnectionError, DriverError};

/// Well-known local Chrome/Chromium debug-endpoint candidates, probed in
/// order.
pub const DEFAULT_DEBUG_ENDPOINTS: &[&str] = &[
    "http://127.0.0.1:9222",
    "http://127.0.0.1:9223",
    "http://127.0.0.1:9224",
    "http://127.0.0.1:9225",
    "http://127.0.0.1:9333",
];

/// What a successful `connect()` produced, for the caller (the execution
/// context) to remember for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    /// Attached to an existing browser (true) vs. launched one (false).
    pub is_cdp: bool,
    /// Found and adopted an existing non-blank page, rather than creating one.
    pub reused_page: bool,
    /// The page this execution should drive.
    pub page: PageId,
    /// Whether a dedicated context (from an injected storage state) was
    /// created and therefore needs explicit teardown.
    pub has_custom_context: bool,
}

pub struct SessionManager {
    driver: Arc<dyn BrowserDriver>,
    debug_endpoints: Vec<String>,
}

impl SessionManager {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            debug_endpoints: DEFAULT_DEBUG_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Connect per the attach-then-launch policy. Idempotent in the sense
    /// that callers are expected to call this at most once per execution;
    /// a second call against an already-connected driver is the driver
    /// implementation's concern, not this manager's.
    #[instrument(skip(self, storage_state))]
    pub async fn connect(
        &self,
        headless: bool,
        storage_state: Option<&StorageState>,
    ) -> Result<ConnectOutcome, BrowserConnectionError> {
        let mut attach_err = None;

        if let Some(endpoint) = self.driver.probe_debug_endpoint(&self.debug_endpoints).await {
            match self.try_attach(&endpoint, storage_state).await {
                Ok(outcome) => {
                    info!(%endpoint, reused_page = outcome.reused_page, "attached to existing browser");
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, "attach failed, falling back to launch");
                    attach_err = Some(e);
                }
            }
        }

        match self.try_launch(headless, storage_state).await {
            Ok(outcome) => Ok(outcome),
            Err(launch_err) => match attach_err {
                Some(attach_err) => Err(BrowserConnectionError::BothFailed { attach: attach_err, launch: launch_err }),
                None => Err(BrowserConnectionError::LaunchFailed(launch_err)),
            },
        }
    }

    async fn try_attach(
        &self,
        endpoint: &str,
        storage_state: Option<&StorageState>,
    ) -> Result<ConnectOutcome, DriverError> {
        self.driver.connect_over_cdp(endpoint).await?;

        // An explicitly injected storage state always wins: materialize a
        // dedicated context for it rather than touching the user's own
        // logged-in context.
        if let Some(state) = storage_state {
            let page = self.driver.new_page_from_storage_state(state).await?;
            return Ok(ConnectOutcome { is_cdp: true, reused_page: false, page, has_custom_context: true });
        }

        let pages = self.driver.list_pages().await?;
        for page in pages {
            if !self.driver.is_blank(&page).await? {
                return Ok(ConnectOutcome { is_cdp: true, reused_page: true, page, has_custom_context: false });
            }
        }

        // No non-blank page to adopt: create one *inside the existing
        // context* — never call a bare "new page" that would spin up a
        // fresh context and lose the attached login state.
        let page = self.driver.new_page_in_current_context().await?;
        Ok(ConnectOutcome { is_cdp: true, reused_page: false, page, has_custom_context: false })
    }

    async fn try_launch(
        &self,
        headless: bool,
        storage_state: Option<&StorageState>,
    ) -> Result<ConnectOutcome, DriverError> {
        self.driver.launch(headless).await?;

        let (page, has_custom_context) = match storage_state {
            Some(state) => (self.driver.new_page_from_storage_state(state).await?, true),
            None => (self.driver.new_page_in_current_context().await?, false),
        };

        Ok(ConnectOutcome { is_cdp: false, reused_page: false, page, has_custom_context })
    }

    /// Tear down exactly what `connect()` created:
    /// - attach + reused page → leave everything alone.
    /// - attach + created page/context → close the page/context, leave
    ///   the user's browser running.
    /// - launch → close the browser driver entirely.
    #[instrument(skip(self, outcome))]
    pub async fn cleanup(&self, outcome: &ConnectOutcome) {
        if !outcome.is_cdp {
            if let Err(e) = self.driver.close_browser().await {
                warn!(error = %e, "failed to close launched browser");
            }
            return;
        }

        if outcome.has_custom_context {
            if let Err(e) = self.driver.close_custom_context().await {
                warn!(error = %e, "failed to close custom context");
            }
        } else if !outcome.reused_page {
            if let Err(e) = self.driver.close_page(&outcome.page).await {
                warn!(error = %e, "failed to close page created for this execution");
            }
        }
        // reused_page under attach: nothing to close.
    }

    pub async fn export_storage_state(&self) -> Result<StorageState, DriverError> {
        self.driver.export_storage_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    #[tokio::test]
    async fn attach_adopts_non_blank_page() {
        let driver = Arc::new(MockDriver::with_debug_endpoint("http://127.0.0.1:9222"));
        driver.push_page("p1", true); // blank
        driver.push_page("p2", false); // non-blank — should be adopted

        let mgr = SessionManager::new(driver);
        let outcome = mgr.connect(true, None).await.unwrap();

        assert!(outcome.is_cdp);
        assert!(outcome.reused_page);
        assert_eq!(outcome.page.0, "p2");
    }

    #[tokio::test]
    async fn attach_with_only_blank_pages_creates_new_page_in_context() {
        let driver = Arc::new(MockDriver::with_debug_endpoint("http://127.0.0.1:9222"));
        driver.push_page("p1", true);

        let mgr = SessionManager::new(driver);
        let outcome = mgr.connect(true, None).await.unwrap();

        assert!(outcome.is_cdp);
        assert!(!outcome.reused_page);
    }

    #[tokio::test]
    async fn no_debug_endpoint_falls_back_to_launch() {
        let driver = Arc::new(MockDriver::new());
        let mgr = SessionManager::new(driver);
        let outcome = mgr.connect(true, None).await.unwrap();

        assert!(!outcome.is_cdp);
        assert!(!outcome.reused_page);
    }

    #[tokio::test]
    async fn launch_with_storage_state_creates_custom_context() {
        let driver = Arc::new(MockDriver::new());
        let mgr = SessionManager::new(driver);
        let state = serde_json::json!({"cookies": []});
        let outcome = mgr.connect(true, Some(&state)).await.unwrap();

        assert!(!outcome.is_cdp);
        assert!(outcome.has_custom_context);
    }

    #[tokio::test]
    async fn cleanup_closes_only_what_it_created() {
        let driver = Arc::new(MockDriver::with_debug_endpoint("http://127.0.0.1:9222"));
        driver.push_page("p1", false);
        let mgr = SessionManager::new(driver.clone());

        let outcome = mgr.connect(true, None).await.unwrap();
        assert!(outcome.reused_page);
        mgr.cleanup(&outcome).await;

        assert!(!driver.page_closed(&outcome.page));
        assert!(!driver.browser_closed());
    }

    #[tokio::test]
    async fn launch_cleanup_closes_whole_browser() {
        let driver = Arc::new(MockDriver::new());
        let mgr = SessionManager::new(driver.clone());

        let outcome = mgr.connect(true, None).await.unwrap();
        mgr.cleanup(&outcome).await;

        assert!(driver.browser_closed());
    }
}
