//! Verdict file written at the end of a run.

use async_trait::async_trait;
use hog_core::{PersistError, ResultStore};
use hog_types::ResultStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Contents of the result file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Unique id of this run.
    pub run_id: String,
    /// Experiment name.
    pub experiment: String,
    /// Unix timestamp of the last update.
    pub updated_at: u64,
    /// Verdict and per-target outcomes.
    pub status: ResultStatus,
}

/// Writes the current verdict as pretty JSON on every `persist`.
pub struct FileResultStore {
    path: PathBuf,
    run_id: String,
    experiment: String,
    status: Mutex<Option<ResultStatus>>,
}

impl FileResultStore {
    /// Create a store writing to `path`.
    pub fn new(path: &Path, experiment: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            run_id: uuid::Uuid::new_v4().to_string(),
            experiment: experiment.to_string(),
            status: Mutex::new(None),
        }
    }

    /// Path the verdict is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self) -> Result<ResultRecord, PersistError> {
        let status = self
            .status
            .lock()
            .map_err(|e| PersistError(e.to_string()))?
            .clone()
            .ok_or_else(|| PersistError("no result status set".into()))?;
        Ok(ResultRecord {
            run_id: self.run_id.clone(),
            experiment: self.experiment.clone(),
            updated_at: unix_now(),
            status,
        })
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    fn set_result_status(&self, status: ResultStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = Some(status);
        }
    }

    async fn persist(&self) -> Result<(), PersistError> {
        let record = self.record()?;
        let contents =
            serde_json::to_string_pretty(&record).map_err(|e| PersistError(e.to_string()))?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| PersistError(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), verdict = ?record.status.verdict, "result written");
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
