//! `ExecutionContext` — the per-run state envelope passed by shared
//! reference into every node's `execute`.
//!
//! A single-use `oneshot` pair is installed fresh by every
//! `request_user_input` call and cleared atomically on resolution, so a
//! late `respond_user_input` against an already-resolved request is a
//! harmless no-op instead of reaching into the next request's slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex as AsyncMutex, RwLock};
use tracing::{instrument, warn};
use uuid::Uuid;

use browser::{BrowserDriver, HybridLocator, InterventionDetector, PageId, StorageState};

use crate::channel::ExecutionChannel;
use crate::error::NodeError;
use crate::protocol::{LogEntry, LogLevel, OutboundEvent, UserInputAction};
use crate::records::{NodeRecord, ScreenshotEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Converts a terminal status into the persisted record's status.
    /// Returns `None` for a non-terminal status — the recorder only ever
    /// calls this once a run has actually finished.
    pub fn to_run_status(self) -> Option<crate::records::RunStatus> {
        match self {
            Self::Completed => Some(crate::records::RunStatus::Completed),
            Self::Failed => Some(crate::records::RunStatus::Failed),
            Self::Cancelled => Some(crate::records::RunStatus::Cancelled),
            _ => None,
        }
    }
}

pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub start_time: chrono::DateTime<Utc>,

    status: std::sync::Mutex<ExecutionStatus>,
    current_node_id: std::sync::Mutex<Option<String>>,
    error: std::sync::Mutex<Option<String>>,

    pub variables: RwLock<HashMap<String, Value>>,
    pub clipboard: RwLock<Option<String>>,

    driver: Arc<dyn BrowserDriver>,
    page: AsyncMutex<PageId>,
    pub locator: HybridLocator,
    intervention: Option<InterventionDetector>,

    storage_state: std::sync::Mutex<Option<StorageState>>,
    channel: Arc<dyn ExecutionChannel>,

    logs: std::sync::Mutex<Vec<LogEntry>>,
    screenshots: std::sync::Mutex<Vec<ScreenshotEntry>>,
    node_records: std::sync::Mutex<HashMap<String, NodeRecord>>,
    recorded_actions: std::sync::Mutex<Vec<Value>>,

    rendezvous: AsyncMutex<Option<oneshot::Sender<UserInputAction>>>,
    cancelled: AtomicBool,

    pub is_cdp: bool,
    pub reused_page: bool,
    pub headless: bool,
}

impl ExecutionContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        execution_id: Uuid,
        workflow_id: Uuid,
        driver: Arc<dyn BrowserDriver>,
        page: PageId,
        locator: HybridLocator,
        intervention: Option<InterventionDetector>,
        channel: Arc<dyn ExecutionChannel>,
        storage_state: Option<StorageState>,
        is_cdp: bool,
        reused_page: bool,
        headless: bool,
    ) -> Self {
        Self {
            execution_id,
            workflow_id,
            start_time: Utc::now(),
            status: std::sync::Mutex::new(ExecutionStatus::Pending),
            current_node_id: std::sync::Mutex::new(None),
            error: std::sync::Mutex::new(None),
            variables: RwLock::new(HashMap::new()),
            clipboard: RwLock::new(None),
            driver,
            page: AsyncMutex::new(page),
            locator,
            intervention,
            storage_state: std::sync::Mutex::new(storage_state),
            channel,
            logs: std::sync::Mutex::new(Vec::new()),
            screenshots: std::sync::Mutex::new(Vec::new()),
            node_records: std::sync::Mutex::new(HashMap::new()),
            recorded_actions: std::sync::Mutex::new(Vec::new()),
            rendezvous: AsyncMutex::new(None),
            cancelled: AtomicBool::new(false),
            is_cdp,
            reused_page,
            headless,
        }
    }

    pub fn driver(&self) -> &Arc<dyn BrowserDriver> {
        &self.driver
    }

    pub fn channel(&self) -> &Arc<dyn ExecutionChannel> {
        &self.channel
    }

    pub fn intervention(&self) -> Option<&InterventionDetector> {
        self.intervention.as_ref()
    }

    pub async fn page(&self) -> PageId {
        self.page.lock().await.clone()
    }

    pub async fn set_page(&self, page: PageId) {
        *self.page.lock().await = page;
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.status.lock().unwrap()
    }

    /// Sets status unless the run already reached a terminal state — any
    /// attempt to mutate status after a terminal state is ignored.
    pub fn set_status(&self, status: ExecutionStatus) {
        let mut guard = self.status.lock().unwrap();
        if guard.is_terminal() {
            return;
        }
        *guard = status;
    }

    pub fn current_node_id(&self) -> Option<String> {
        self.current_node_id.lock().unwrap().clone()
    }

    pub fn set_current_node_id(&self, id: Option<String>) {
        *self.current_node_id.lock().unwrap() = id;
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *self.error.lock().unwrap() = Some(message.into());
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    pub fn node_record(&self, node_id: &str) -> Option<NodeRecord> {
        self.node_records.lock().unwrap().get(node_id).cloned()
    }

    pub fn insert_node_record(&self, record: NodeRecord) {
        self.node_records.lock().unwrap().insert(record.node_id.clone(), record);
    }

    pub fn update_node_record(&self, node_id: &str, f: impl FnOnce(&mut NodeRecord)) {
        if let Some(rec) = self.node_records.lock().unwrap().get_mut(node_id) {
            f(rec);
        }
    }

    pub fn node_records_snapshot(&self) -> Vec<NodeRecord> {
        self.node_records.lock().unwrap().values().cloned().collect()
    }

    pub fn logs_for_node(&self, node_id: &str) -> Vec<LogEntry> {
        self.logs.lock().unwrap().iter().filter(|l| l.node_id.as_deref() == Some(node_id)).cloned().collect()
    }

    pub fn all_logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }

    pub fn record_action(&self, kind: &str, details: Value) {
        let mut entry = serde_json::json!({ "kind": kind });
        if let (Some(obj), Some(details_obj)) = (entry.as_object_mut(), details.as_object()) {
            for (k, v) in details_obj {
                obj.insert(k.clone(), v.clone());
            }
        }
        self.recorded_actions.lock().unwrap().push(entry);
    }

    pub fn recorded_actions(&self) -> Vec<Value> {
        self.recorded_actions.lock().unwrap().clone()
    }

    pub async fn storage_state(&self) -> Option<StorageState> {
        self.storage_state.lock().unwrap().clone()
    }

    pub fn set_storage_state(&self, state: Option<StorageState>) {
        *self.storage_state.lock().unwrap() = state;
    }

    /// Appends to the log and emits a `log` event. Never blocks for long
    /// on a dead channel — the channel's own `send` is drop-on-closed.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>, node_id: Option<&str>) {
        let message = message.into();
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level,
            message: message.clone(),
            node_id: node_id.map(str::to_string),
        };
        self.logs.lock().unwrap().push(entry.clone());
        self.channel
            .send(OutboundEvent::Log {
                timestamp: entry.timestamp,
                level,
                message: entry.message,
                node_id: entry.node_id,
            })
            .await;
    }

    /// Captures a screenshot of the current page and emits it. Swallows
    /// driver errors — a failed screenshot never fails the node.
    pub async fn send_screenshot(&self, node_id: &str) {
        let page = self.page().await;
        let data = match self.driver.screenshot_jpeg_base64(&page).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "screenshot capture failed");
                return;
            }
        };
        let timestamp = Utc::now();
        self.screenshots.lock().unwrap().push(ScreenshotEntry {
            node_id: node_id.to_string(),
            data: data.clone(),
            timestamp,
        });
        self.channel
            .send(OutboundEvent::Screenshot { node_id: node_id.to_string(), data, timestamp: timestamp.to_rfc3339() })
            .await;
    }

    /// Pauses the run, emits `user_input_required`, and waits on a
    /// freshly created rendezvous up to `timeout`. Restores the prior
    /// status on every exit path.
    #[instrument(skip(self))]
    pub async fn request_user_input(&self, node_id: &str, prompt: &str, timeout: Duration) -> Result<(), NodeError> {
        let event = OutboundEvent::UserInputRequired {
            node_id: node_id.to_string(),
            prompt: prompt.to_string(),
            timeout: timeout.as_secs(),
        };
        self.pause_for_rendezvous(event, timeout).await
    }

    /// Same pause/wait/restore mechanics as [`Self::request_user_input`],
    /// for a caller that has already built a different outbound event
    /// (`ai_intervention_required` instead of `user_input_required`).
    pub async fn await_intervention_response(&self, event: OutboundEvent, timeout: Duration) -> Result<(), NodeError> {
        self.pause_for_rendezvous(event, timeout).await
    }

    async fn pause_for_rendezvous(&self, event: OutboundEvent, timeout: Duration) -> Result<(), NodeError> {
        let previous = self.status();
        self.set_status(ExecutionStatus::Paused);
        self.channel.send(event).await;

        let (tx, rx) = oneshot::channel();
        *self.rendezvous.lock().await = Some(tx);

        let outcome = tokio::time::timeout(timeout, rx).await;
        // Clear the slot regardless of how we got here so a late response
        // to *this* request can never resolve the *next* one.
        *self.rendezvous.lock().await = None;

        if !self.status().is_terminal() {
            self.set_status(previous);
        }

        match outcome {
            Ok(Ok(UserInputAction::Continue)) => Ok(()),
            Ok(Ok(UserInputAction::Cancel)) => Err(NodeError::UserCancelled),
            Ok(Err(_)) => Err(NodeError::UserCancelled), // sender dropped without a response, e.g. cancel() fired
            Err(_) => Err(NodeError::UserInputTimeout),
        }
    }

    /// Stores the response and releases the rendezvous. A no-op if no
    /// request is currently outstanding (already resolved, or none ever
    /// opened) — idempotent after the first call per request.
    pub async fn respond_user_input(&self, action: UserInputAction) {
        if let Some(tx) = self.rendezvous.lock().await.take() {
            let _ = tx.send(action);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.status() == ExecutionStatus::Cancelled
    }

    pub fn check_cancelled(&self) -> Result<(), NodeError> {
        if self.is_cancelled() {
            Err(NodeError::UserCancelled)
        } else {
            Ok(())
        }
    }

    /// Flips to cancelled and releases any outstanding rendezvous with
    /// `cancel`, so a task parked in `request_user_input` unwinds to
    /// cleanup instead of hanging.
    pub async fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.set_status(ExecutionStatus::Cancelled);
        self.respond_user_input(UserInputAction::Cancel).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser::mock::MockDriver;
    use std::sync::Mutex as StdMutex;

    struct RecordingChannel {
        events: StdMutex<Vec<OutboundEvent>>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self { events: StdMutex::new(Vec::new()) }
        }
    }

    #[async_trait::async_trait]
    impl ExecutionChannel for RecordingChannel {
        async fn send(&self, event: OutboundEvent) {
            self.events.lock().unwrap().push(event);
        }
        async fn try_recv_control(&self) -> Option<crate::protocol::InboundControl> {
            None
        }
    }

    fn make_ctx(channel: Arc<dyn ExecutionChannel>) -> ExecutionContext {
        let driver: Arc<dyn BrowserDriver> = Arc::new(MockDriver::new());
        let locator = HybridLocator::new(driver.clone(), None);
        ExecutionContext::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            driver,
            PageId("p1".into()),
            locator,
            None,
            channel,
            None,
            false,
            false,
            true,
        )
    }

    #[tokio::test]
    async fn respond_before_request_is_a_harmless_no_op() {
        let ctx = make_ctx(Arc::new(RecordingChannel::new()));
        ctx.respond_user_input(UserInputAction::Continue).await;
        assert_eq!(ctx.status(), ExecutionStatus::Pending);
    }

    #[tokio::test]
    async fn continue_response_resolves_request_and_restores_status() {
        let ctx = Arc::new(make_ctx(Arc::new(RecordingChannel::new())));
        ctx.set_status(ExecutionStatus::Running);

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.request_user_input("n1", "ok?", Duration::from_secs(5)).await })
        };

        // give the rendezvous a moment to be installed
        tokio::task::yield_now().await;
        ctx.respond_user_input(UserInputAction::Continue).await;

        let result = waiter.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(ctx.status(), ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn timeout_yields_user_input_timeout_error() {
        tokio::time::pause();
        let ctx = Arc::new(make_ctx(Arc::new(RecordingChannel::new())));
        ctx.set_status(ExecutionStatus::Running);

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.request_user_input("n1", "ok?", Duration::from_millis(50)).await })
        };
        tokio::time::advance(Duration::from_millis(100)).await;

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(NodeError::UserInputTimeout)));
    }

    #[tokio::test]
    async fn stale_response_does_not_leak_into_next_request() {
        tokio::time::pause();
        let ctx = Arc::new(make_ctx(Arc::new(RecordingChannel::new())));
        ctx.set_status(ExecutionStatus::Running);

        // First request resolves and clears its slot.
        let first = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.request_user_input("n1", "first?", Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        ctx.respond_user_input(UserInputAction::Continue).await;
        first.await.unwrap().unwrap();

        // A late duplicate response call must not affect a second,
        // still-open request.
        ctx.respond_user_input(UserInputAction::Cancel).await;

        let handle = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.request_user_input("n2", "second?", Duration::from_millis(50)).await })
        };
        tokio::time::advance(Duration::from_millis(100)).await;
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(NodeError::UserInputTimeout)));
    }

    #[tokio::test]
    async fn cancel_releases_outstanding_rendezvous() {
        let ctx = Arc::new(make_ctx(Arc::new(RecordingChannel::new())));
        ctx.set_status(ExecutionStatus::Running);

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.request_user_input("n1", "ok?", Duration::from_secs(30)).await })
        };
        tokio::task::yield_now().await;
        ctx.cancel().await;

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(NodeError::UserCancelled)));
    }
}
