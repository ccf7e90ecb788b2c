use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, JobRecord};
use crate::scoring::{
    parse_difficulty_score, parse_hourly_rate, parse_workload_hours, score, ScoringWeights,
};

/// Skill-fit score used until (or instead of) an LLM evaluation.
pub const NEUTRAL_SKILL_FIT: f64 = 5.0;

/// An analysed job plus every numeric field the recommender derives for it.
///
/// `recommendation_score` is private: it is recomputed whenever the skill-fit
/// score changes and can never drift from the other numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredJob {
    pub job: JobRecord,
    pub analysis: AnalysisResult,
    pub hourly_rate: u32,
    pub workload_hours: f64,
    pub difficulty_score: u8,
    pub skill_fit_score: f64,
    #[serde(default)]
    pub skill_analysis: String,
    #[serde(default)]
    pub proposal_greeting: String,
    #[serde(default)]
    pub delivery_estimate: String,
    #[serde(default)]
    pub specification_questions: String,
    recommendation_score: f64,
}

impl ScoredJob {
    /// Normalizes the analysis text fields and computes a provisional score
    /// with a neutral skill fit.
    pub fn new(job: JobRecord, analysis: AnalysisResult, weights: &ScoringWeights) -> Self {
        let hourly_rate = parse_hourly_rate(&analysis.estimated_hourly_rate_text);
        let workload_hours = parse_workload_hours(&analysis.estimated_workload_text);
        let difficulty_score = parse_difficulty_score(&analysis.difficulty_text);

        Self {
            job,
            analysis,
            hourly_rate,
            workload_hours,
            difficulty_score,
            skill_fit_score: NEUTRAL_SKILL_FIT,
            skill_analysis: String::new(),
            proposal_greeting: String::new(),
            delivery_estimate: String::new(),
            specification_questions: String::new(),
            recommendation_score: score(hourly_rate, workload_hours, NEUTRAL_SKILL_FIT, weights),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }

    pub fn recommendation_score(&self) -> f64 {
        self.recommendation_score
    }

    /// Sets the skill-fit result (clamped to 0–10) and rescores immediately.
    pub fn apply_skill_fit(&mut self, skill_fit: f64, analysis: String, weights: &ScoringWeights) {
        self.skill_fit_score = if skill_fit.is_finite() {
            skill_fit.clamp(0.0, 10.0)
        } else {
            NEUTRAL_SKILL_FIT
        };
        self.skill_analysis = analysis;
        self.rescore(weights);
    }

    pub fn rescore(&mut self, weights: &ScoringWeights) {
        self.recommendation_score = score(
            self.hourly_rate,
            self.workload_hours,
            self.skill_fit_score,
            weights,
        );
    }

    pub fn has_proposal(&self) -> bool {
        !self.proposal_greeting.trim().is_empty()
    }
}
