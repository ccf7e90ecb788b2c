use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::cache::write_atomically;
use crate::errors::AppError;
use crate::models::ScoredJob;
use crate::pipeline::{BatchResult, PhaseOutcome};

/// Result of one batch run: jobs ordered best first, plus phase statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub jobs: Vec<ScoredJob>,
    pub skill_fit: BatchResult<PhaseOutcome>,
    pub proposal: BatchResult<PhaseOutcome>,
}

impl RankedReport {
    pub fn top(&self, n: usize) -> &[ScoredJob] {
        &self.jobs[..n.min(self.jobs.len())]
    }
}

/// Where a finished report goes. The driver hands every report to exactly one sink.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn render(&self, report: &RankedReport) -> Result<(), AppError>;
}

/// Writes the report as pretty-printed JSON, replacing the file atomically.
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn render(&self, report: &RankedReport) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| AppError::Report(format!("failed to serialize report: {e}")))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &body))
            .await
            .map_err(|e| AppError::Report(format!("report writer task failed: {e}")))?
            .map_err(|e| AppError::Report(format!("failed to write report: {e}")))?;

        info!(path = %self.path.display(), jobs = report.jobs.len(), "Wrote ranked report");
        Ok(())
    }
}
