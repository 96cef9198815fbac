//! Execution recorder.
//!
//! Mutates the `NodeRecord` entries living inside `ExecutionContext` and,
//! at the end of a run, assembles and persists the terminal
//! `ExecutionRecord`. Persistence failures are logged, never propagated —
//! a workflow's own outcome never depends on whether the archive write
//! succeeded.

use chrono::Utc;
use nodes::{ExecutionContext, ExecutionRecord, NodeRecord, RunStatus};
use persistence::ExecutionRepository;
use serde_json::Value;
use tracing::warn;

pub struct ExecutionRecorder;

impl ExecutionRecorder {
    pub fn start_node(ctx: &ExecutionContext, node_id: &str, node_type: &str, label: &str) {
        ctx.insert_node_record(NodeRecord::start(node_id, node_type, label));
        ctx.set_current_node_id(Some(node_id.to_string()));
    }

    pub fn complete_node(ctx: &ExecutionContext, node_id: &str, result: Value) {
        let logs = ctx.logs_for_node(node_id);
        ctx.update_node_record(node_id, |record| record.complete(result, logs));
    }

    pub fn fail_node(ctx: &ExecutionContext, node_id: &str, error: &str) {
        let logs = ctx.logs_for_node(node_id);
        ctx.update_node_record(node_id, |record| record.fail(error, logs));
    }

    /// Assembles the terminal record from whatever `ExecutionContext` has
    /// accumulated. `total_nodes` is passed explicitly since the context
    /// itself has no notion of the workflow's full node count.
    pub fn build_execution_record(ctx: &ExecutionContext, status: RunStatus, total_nodes: usize) -> ExecutionRecord {
        let node_records = ctx.node_records_snapshot();
        let completed_nodes = node_records.iter().filter(|r| r.status == nodes::NodeStatus::Completed).count();
        let failed_nodes = node_records.iter().filter(|r| r.status == nodes::NodeStatus::Failed).count();
        let finished_at = Utc::now();

        ExecutionRecord {
            execution_id: ctx.execution_id.to_string(),
            workflow_id: ctx.workflow_id.to_string(),
            status,
            started_at: ctx.start_time,
            finished_at,
            duration_ms: (finished_at - ctx.start_time).num_milliseconds(),
            total_nodes,
            completed_nodes,
            failed_nodes,
            node_records,
        }
    }

    /// Best-effort save: logs and swallows any repository error.
    pub async fn save(repository: &dyn ExecutionRepository, record: &ExecutionRecord) {
        if let Err(e) = repository.save_execution(record).await {
            warn!(error = %e, execution_id = %record.execution_id, "failed to persist execution record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser::mock::MockDriver;
    use browser::{BrowserDriver, HybridLocator, PageId};
    use nodes::NullChannel;
    use persistence::JsonFileExecutionRepository;
    use std::sync::Arc;

    fn make_ctx() -> ExecutionContext {
        let driver: Arc<dyn BrowserDriver> = Arc::new(MockDriver::new());
        let locator = HybridLocator::new(driver.clone(), None);
        ExecutionContext::new(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            driver,
            PageId("p1".into()),
            locator,
            None,
            Arc::new(NullChannel),
            None,
            false,
            false,
            true,
        )
    }

    #[tokio::test]
    async fn start_complete_cycle_produces_a_completed_record() {
        let ctx = make_ctx();
        ExecutionRecorder::start_node(&ctx, "n1", "navigate", "Navigate");
        ExecutionRecorder::complete_node(&ctx, "n1", serde_json::json!({"url": "https://x"}));

        let record = ctx.node_record("n1").unwrap();
        assert_eq!(record.status, nodes::NodeStatus::Completed);
        assert_eq!(ctx.current_node_id().as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn build_execution_record_counts_completed_and_failed() {
        let ctx = make_ctx();
        ExecutionRecorder::start_node(&ctx, "n1", "navigate", "Navigate");
        ExecutionRecorder::complete_node(&ctx, "n1", Value::Null);
        ExecutionRecorder::start_node(&ctx, "n2", "click", "Click");
        ExecutionRecorder::fail_node(&ctx, "n2", "no such element");

        let record = ExecutionRecorder::build_execution_record(&ctx, RunStatus::Failed, 2);
        assert_eq!(record.total_nodes, 2);
        assert_eq!(record.completed_nodes, 1);
        assert_eq!(record.failed_nodes, 1);
    }

    #[tokio::test]
    async fn save_persists_through_the_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path()).await.unwrap();

        let ctx = make_ctx();
        let record = ExecutionRecorder::build_execution_record(&ctx, RunStatus::Completed, 0);
        let workflow_id = record.workflow_id.clone();
        ExecutionRecorder::save(&repo, &record).await;

        let loaded = repo.get_latest_execution(&workflow_id).await.unwrap();
        assert!(loaded.is_some());
    }
}
