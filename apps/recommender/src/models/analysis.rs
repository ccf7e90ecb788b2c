use serde::{Deserialize, Serialize};

use crate::models::job::Platform;

/// Analysis record as written by the upstream LLM-analysis step, keyed by the
/// platform's raw job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAnalysis {
    #[serde(alias = "id")]
    pub job_id: String,
    #[serde(default, alias = "workload")]
    pub estimated_workload_text: String,
    #[serde(default, alias = "hourlyRate")]
    pub estimated_hourly_rate_text: String,
    #[serde(default, alias = "difficulty")]
    pub difficulty_text: String,
    #[serde(default, alias = "summary")]
    pub summary_text: String,
}

impl SourceAnalysis {
    pub fn into_result(self, platform: Platform) -> AnalysisResult {
        AnalysisResult {
            job_id: platform.prefixed_id(&self.job_id),
            estimated_workload_text: self.estimated_workload_text,
            estimated_hourly_rate_text: self.estimated_hourly_rate_text,
            difficulty_text: self.difficulty_text,
            summary_text: self.summary_text,
        }
    }
}

/// LLM-derived judgment about a job. Immutable input to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub job_id: String,
    pub estimated_workload_text: String,
    pub estimated_hourly_rate_text: String,
    pub difficulty_text: String,
    pub summary_text: String,
}
