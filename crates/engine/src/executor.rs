//! Workflow execution engine.
//!
//! `Engine::execute` is the central orchestrator:
//! 1. Validates the DAG and produces a topological ordering.
//! 2. Connects (attach-or-launch) the browser session.
//! 3. Walks nodes in order: interpolate config, record/emit/dispatch/
//!    record, with a cancellation checkpoint before and after each node.
//! 4. Round-trips storage state and tears down the session on every exit.
//! 5. Persists the terminal `ExecutionRecord`, best-effort.
//!
//! There is no per-node retry — a node's `NodeError` is fatal to the run,
//! carried unchanged from `nodes::NodeError`'s own doc comment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use browser::{BrowserDriver, HybridLocator, InterventionDetector, LlmClient, SessionManager, StorageState};
use nodes::actions::config::opt_bool;
use nodes::protocol::{InboundControl, OutboundEvent};
use nodes::{ExecutionChannel, ExecutionContext, ExecutionStatus, NodeError, RunStatus};
use persistence::ExecutionRepository;

use crate::models::{NodeDefinition, Workflow};
use crate::recorder::ExecutionRecorder;
use crate::registry::ActionRegistry;
use crate::{dag::validate_dag, interpolate::interpolate, EngineError};

/// Everything one call to [`Engine::execute`] needs beyond the workflow
/// document itself.
pub struct ExecuteParams {
    pub execution_id: Uuid,
    pub driver: Arc<dyn BrowserDriver>,
    pub channel: Arc<dyn ExecutionChannel>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub headless: bool,
    pub storage_state: Option<StorageState>,
}

/// The result of running a full workflow to completion, cancellation, or
/// failure — always `Ok` once the DAG itself was valid; runtime failures
/// are captured in `status`/`record`, not in the `Result`.
pub struct ExecutionOutcome {
    pub status: RunStatus,
    pub record: nodes::ExecutionRecord,
}

/// Owns the process-wide action registry, the persistence repository, and
/// the map of currently-running executions. One `Engine` value is
/// assembled at process startup (in `cli`/`api`) and shared by reference.
pub struct Engine {
    registry: Arc<ActionRegistry>,
    repository: Arc<dyn ExecutionRepository>,
    active: std::sync::Mutex<HashMap<Uuid, Arc<ExecutionContext>>>,
}

impl Engine {
    pub fn new(registry: ActionRegistry, repository: Arc<dyn ExecutionRepository>) -> Self {
        Self { registry: Arc::new(registry), repository, active: std::sync::Mutex::new(HashMap::new()) }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Signals cancellation to a live execution. Returns `false` if no
    /// execution with that id is currently running.
    pub async fn cancel(&self, execution_id: Uuid) -> bool {
        let ctx = self.active.lock().unwrap().get(&execution_id).cloned();
        match ctx {
            Some(ctx) => {
                ctx.cancel().await;
                true
            }
            None => false,
        }
    }

    #[instrument(skip(self, workflow, params), fields(workflow_id = %workflow.id, execution_id = %params.execution_id))]
    pub async fn execute(&self, workflow: &Workflow, params: ExecuteParams) -> Result<ExecutionOutcome, EngineError> {
        let sorted_ids = validate_dag(workflow)?;
        let node_map: HashMap<&str, &NodeDefinition> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        info!(nodes = sorted_ids.len(), "executing workflow");

        let session = SessionManager::new(params.driver.clone());
        let connect_outcome = match session.connect(params.headless, params.storage_state.as_ref()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "failed to establish browser session");
                let started_at = Utc::now();
                let record = nodes::ExecutionRecord {
                    execution_id: params.execution_id.to_string(),
                    workflow_id: workflow.id.to_string(),
                    status: RunStatus::Failed,
                    started_at,
                    finished_at: started_at,
                    duration_ms: 0,
                    total_nodes: sorted_ids.len(),
                    completed_nodes: 0,
                    failed_nodes: 0,
                    node_records: Vec::new(),
                };
                ExecutionRecorder::save(self.repository.as_ref(), &record).await;
                params.channel.send(OutboundEvent::Error { node_id: None, message: e.to_string() }).await;
                return Ok(ExecutionOutcome { status: RunStatus::Failed, record });
            }
        };

        let locator = HybridLocator::new(params.driver.clone(), params.llm.clone());
        let intervention = params.llm.clone().map(InterventionDetector::new);

        let ctx = Arc::new(ExecutionContext::new(
            params.execution_id,
            workflow.id,
            params.driver.clone(),
            connect_outcome.page.clone(),
            locator,
            intervention,
            params.channel.clone(),
            params.storage_state.clone(),
            connect_outcome.is_cdp,
            connect_outcome.reused_page,
            params.headless,
        ));

        self.active.lock().unwrap().insert(params.execution_id, ctx.clone());
        ctx.set_status(ExecutionStatus::Running);

        ctx.channel()
            .send(OutboundEvent::ExecutionStarted {
                execution_id: params.execution_id.to_string(),
                workflow_id: workflow.id.to_string(),
                node_order: sorted_ids.clone(),
            })
            .await;

        let control_task = tokio::spawn(control_loop(ctx.clone()));

        let run_result = self.run_nodes(&ctx, &sorted_ids, &node_map, params.driver.as_ref()).await;
        control_task.abort();

        let final_status = match &run_result {
            Ok(()) => ExecutionStatus::Completed,
            Err(e) if e.is_cancellation() => ExecutionStatus::Cancelled,
            Err(_) => ExecutionStatus::Failed,
        };
        ctx.set_status(final_status);
        ctx.set_current_node_id(None);

        if final_status == ExecutionStatus::Completed {
            match session.export_storage_state().await {
                Ok(state) => {
                    ctx.set_storage_state(Some(state.clone()));
                    ctx.channel().send(OutboundEvent::StorageStateUpdate { data: state }).await;
                }
                Err(e) => warn!(error = %e, "failed to export storage state"),
            }
        }

        session.cleanup(&connect_outcome).await;
        self.active.lock().unwrap().remove(&params.execution_id);

        let run_status = final_status.to_run_status().expect("final_status is always terminal");
        let record = ExecutionRecorder::build_execution_record(&ctx, run_status, sorted_ids.len());
        ExecutionRecorder::save(self.repository.as_ref(), &record).await;

        match run_status {
            RunStatus::Cancelled => {
                ctx.channel()
                    .send(OutboundEvent::ExecutionCancelled { execution_id: params.execution_id.to_string() })
                    .await;
            }
            _ => {
                ctx.channel()
                    .send(OutboundEvent::ExecutionComplete {
                        execution_id: params.execution_id.to_string(),
                        success: run_status == RunStatus::Completed,
                        duration: record.duration_ms.max(0) as u64,
                        logs: ctx.all_logs(),
                    })
                    .await;
            }
        }

        Ok(ExecutionOutcome { status: run_status, record })
    }

    /// Walks the sorted node order once. Returns the first `NodeError` hit
    /// (cancellation or failure); `Ok(())` means every node completed.
    async fn run_nodes(
        &self,
        ctx: &Arc<ExecutionContext>,
        sorted_ids: &[String],
        node_map: &HashMap<&str, &NodeDefinition>,
        driver: &dyn BrowserDriver,
    ) -> Result<(), NodeError> {
        for node_id in sorted_ids {
            ctx.check_cancelled()?;

            let node_def = node_map[node_id.as_str()];
            let action = self.registry.lookup(&node_def.node_type).ok_or_else(|| {
                NodeError::Fatal(format!("no implementation registered for node_type '{}'", node_def.node_type))
            })?;

            let variables = ctx.variables.read().await.clone();
            let config = interpolate(&node_def.config, &variables);

            ExecutionRecorder::start_node(ctx, node_id, &node_def.node_type, &node_def.label);
            ctx.channel()
                .send(OutboundEvent::NodeStart { node_id: node_id.clone(), node_type: node_def.node_type.clone() })
                .await;

            let outcome = match self.check_intervention(ctx, node_id, &node_def.node_type, &config).await {
                Ok(()) => action.node.execute(ctx, node_id, config).await,
                Err(e) => Err(e),
            };
            let outcome = reclassify_cancellation(outcome, ctx, driver);

            match outcome {
                Ok(value) => {
                    self.emit_selector_update_if_healed(ctx, node_id, &value).await;
                    ExecutionRecorder::complete_node(ctx, node_id, value.clone());
                    let record = ctx.node_record(node_id).expect("just recorded");
                    ctx.channel()
                        .send(OutboundEvent::NodeComplete {
                            node_id: node_id.clone(),
                            success: true,
                            result: Some(value),
                            error: None,
                            record,
                        })
                        .await;
                    ctx.send_screenshot(node_id).await;
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    let message = e.to_string();
                    ExecutionRecorder::fail_node(ctx, node_id, &message);
                    let record = ctx.node_record(node_id).expect("just recorded");
                    ctx.channel()
                        .send(OutboundEvent::NodeComplete {
                            node_id: node_id.clone(),
                            success: false,
                            result: None,
                            error: Some(message.clone()),
                            record,
                        })
                        .await;
                    ctx.channel().send(OutboundEvent::Error { node_id: Some(node_id.clone()), message }).await;
                    ctx.send_screenshot(node_id).await;
                    return Err(e);
                }
            }

            ctx.check_cancelled()?;
        }
        Ok(())
    }

    /// If the node's config sets `enable_intervention_check`, screenshots
    /// the current page and runs it past the intervention detector before
    /// the node itself dispatches. A `needs_intervention` verdict emits
    /// `ai_intervention_required` and enters the same pause/resume
    /// rendezvous a `user_input` node uses.
    async fn check_intervention(
        &self,
        ctx: &ExecutionContext,
        node_id: &str,
        node_type: &str,
        config: &Value,
    ) -> Result<(), NodeError> {
        if !opt_bool(config, "enable_intervention_check", false) {
            return Ok(());
        }
        let Some(detector) = ctx.intervention() else {
            warn!(node_id = node_id, "enable_intervention_check set but no LLM configured, skipping");
            return Ok(());
        };

        let page = ctx.page().await;
        let screenshot = match ctx.driver().screenshot_jpeg_base64(&page).await {
            Ok(s) => s,
            Err(e) => {
                warn!(node_id = node_id, error = %e, "could not capture screenshot for intervention check, skipping");
                return Ok(());
            }
        };

        let verdict = detector.detect(&screenshot).await;
        if !verdict.needs_intervention {
            return Ok(());
        }

        let event = OutboundEvent::AiInterventionRequired {
            node_id: node_id.to_string(),
            node_type: node_type.to_string(),
            intervention_type: verdict.intervention_type.as_str().to_string(),
            reason: verdict.reason,
            confidence: verdict.confidence,
            screenshot,
        };
        ctx.await_intervention_response(event, Duration::from_secs(INTERVENTION_TIMEOUT_SECS)).await
    }

    async fn emit_selector_update_if_healed(&self, ctx: &ExecutionContext, node_id: &str, value: &Value) {
        let authored = value.get("selector").and_then(Value::as_str);
        let effective = value.get("effective_selector").and_then(Value::as_str);
        if let (Some(authored), Some(effective)) = (authored, effective) {
            if authored != effective {
                ctx.channel()
                    .send(OutboundEvent::SelectorUpdate { node_id: node_id.to_string(), selector: effective.to_string() })
                    .await;
            }
        }
    }
}

const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEBUG_LOCATE_TIMEOUT_MS: u64 = 10_000;
const INTERVENTION_TIMEOUT_SECS: u64 = 300;

/// Drains inbound control messages for the lifetime of one execution —
/// `stop_execution` cancels it, `user_input_response` resolves a pending
/// rendezvous, and `debug_ai_locator` runs the locator against the live
/// page without touching any node's record. Aborted by the caller once
/// the run reaches a terminal state.
async fn control_loop(ctx: Arc<ExecutionContext>) {
    loop {
        match ctx.channel().try_recv_control().await {
            Some(InboundControl::StopExecution) => ctx.cancel().await,
            Some(InboundControl::UserInputResponse { action, .. }) => ctx.respond_user_input(action).await,
            Some(InboundControl::DebugAiLocator { node_id, target_description, saved_selector }) => {
                let page = ctx.page().await;
                let result = ctx
                    .locator
                    .locate(&page, &target_description, saved_selector.as_deref(), true, DEBUG_LOCATE_TIMEOUT_MS)
                    .await;
                let event = match result {
                    Ok(loc) => OutboundEvent::DebugLocatorResult {
                        node_id,
                        success: true,
                        selector: Some(loc.selector),
                        confidence: Some(loc.confidence),
                        method: Some(format!("{:?}", loc.method)),
                        reasoning: Some(loc.reasoning),
                        error: None,
                    },
                    Err(e) => OutboundEvent::DebugLocatorResult {
                        node_id,
                        success: false,
                        selector: None,
                        confidence: None,
                        method: None,
                        reasoning: None,
                        error: Some(e.to_string()),
                    },
                };
                ctx.channel().send(event).await;
            }
            // Already running; nothing to (re)start. Acknowledged elsewhere.
            Some(InboundControl::StartExecution { .. } | InboundControl::LoginConfirmed) => {}
            None => tokio::time::sleep(CONTROL_POLL_INTERVAL).await,
        }
    }
}

/// Reclassifies a driver error arriving while a stop is already in flight
/// as cancellation rather than a fatal node error, via the driver's own
/// `is_target_closed` hook so the core never does driver-specific string
/// sniffing.
fn reclassify_cancellation(
    outcome: Result<Value, NodeError>,
    ctx: &ExecutionContext,
    driver: &dyn BrowserDriver,
) -> Result<Value, NodeError> {
    match outcome {
        Err(NodeError::Driver(ref derr)) if ctx.is_cancelled() && driver.is_target_closed(derr) => {
            Err(NodeError::UserCancelled)
        }
        other => other,
    }
}
