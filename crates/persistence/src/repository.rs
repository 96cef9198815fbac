//! `ExecutionRepository` — the persistence contract for terminal run
//! records: one file per workflow, latest execution only, atomic
//! tmp-then-rename write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nodes::ExecutionRecord;
use tracing::instrument;

use crate::error::PersistenceError;

#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), PersistenceError>;

    async fn get_latest_execution(&self, workflow_id: &str) -> Result<Option<ExecutionRecord>, PersistenceError>;

    async fn delete_execution(&self, workflow_id: &str) -> Result<bool, PersistenceError>;
}

/// File-backed implementation: `{base_dir}/{workflow_id}.json`, replaced
/// atomically on every save so a reader never observes a partial write.
pub struct JsonFileExecutionRepository {
    base_dir: PathBuf,
}

impl JsonFileExecutionRepository {
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, workflow_id: &str) -> PathBuf {
        self.base_dir.join(format!("{workflow_id}.json"))
    }
}

#[async_trait]
impl ExecutionRepository for JsonFileExecutionRepository {
    #[instrument(skip(self, record), fields(workflow_id = %record.workflow_id))]
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), PersistenceError> {
        let path = self.path_for(&record.workflow_id);
        let tmp_path = tmp_path_for(&path);
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn get_latest_execution(&self, workflow_id: &str) -> Result<Option<ExecutionRecord>, PersistenceError> {
        let path = self.path_for(workflow_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_execution(&self, workflow_id: &str) -> Result<bool, PersistenceError> {
        let path = self.path_for(workflow_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nodes::{NodeRecord, RunStatus};

    fn sample_record(workflow_id: &str) -> ExecutionRecord {
        let now = Utc::now();
        ExecutionRecord {
            execution_id: "e1".into(),
            workflow_id: workflow_id.into(),
            status: RunStatus::Completed,
            started_at: now,
            finished_at: now,
            duration_ms: 10,
            total_nodes: 1,
            completed_nodes: 1,
            failed_nodes: 0,
            node_records: vec![NodeRecord::start("n1", "start", "Start")],
        }
    }

    #[tokio::test]
    async fn save_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path()).await.unwrap();
        let record = sample_record("w1");

        repo.save_execution(&record).await.unwrap();
        let loaded = repo.get_latest_execution("w1").await.unwrap().unwrap();
        assert_eq!(loaded.execution_id, "e1");
        assert_eq!(loaded.workflow_id, "w1");
    }

    #[tokio::test]
    async fn unknown_workflow_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path()).await.unwrap();
        assert!(repo.get_latest_execution("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_save_overwrites_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path()).await.unwrap();

        let mut first = sample_record("w1");
        first.execution_id = "e1".into();
        repo.save_execution(&first).await.unwrap();

        let mut second = sample_record("w1");
        second.execution_id = "e2".into();
        repo.save_execution(&second).await.unwrap();

        let loaded = repo.get_latest_execution("w1").await.unwrap().unwrap();
        assert_eq!(loaded.execution_id, "e2");

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1, "only the latest record file should remain");
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path()).await.unwrap();
        repo.save_execution(&sample_record("w1")).await.unwrap();

        assert!(repo.delete_execution("w1").await.unwrap());
        assert!(repo.get_latest_execution("w1").await.unwrap().is_none());
        assert!(!repo.delete_execution("w1").await.unwrap());
    }
}
