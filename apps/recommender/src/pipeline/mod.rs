//! Skill-fit / proposal pipeline.
//!
//! Flow per batch: load cache → phase 1 (skill fit, every job) → checkpoint
//! save → phase 2 (proposals, jobs at or above the rate threshold) →
//! checkpoint save. Each phase runs its LLM calls through its own
//! [`ConcurrencyLimiter`]. A per-job failure leaves that job at neutral
//! defaults and never aborts the batch; only cache saves can fail the run.

pub mod parse;
pub mod prompts;
pub mod proposal;
pub mod skill_fit;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheError, ResultCache};
use crate::limiter::{ConcurrencyLimiter, LimiterError};
use crate::llm_client::LlmBackend;
use crate::models::ScoredJob;
use crate::scoring::ScoringWeights;

pub use proposal::ProposalPhase;
pub use skill_fit::SkillFitPhase;

/// How a job's phase result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    CacheHit,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub job_id: String,
    pub resolution: Resolution,
}

/// A job whose LLM call failed. The job keeps neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub job_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<JobFailure>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl BatchResult<PhaseOutcome> {
    pub fn cache_hits(&self) -> usize {
        self.count(Resolution::CacheHit)
    }

    pub fn computed(&self) -> usize {
        self.count(Resolution::Computed)
    }

    /// LLM calls attempted in this phase, failed ones included.
    pub fn llm_calls(&self) -> usize {
        self.computed() + self.failed.len()
    }

    fn count(&self, resolution: Resolution) -> usize {
        self.succeeded
            .iter()
            .filter(|o| o.resolution == resolution)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub skill_fit: BatchResult<PhaseOutcome>,
    pub proposal: BatchResult<PhaseOutcome>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub skill_concurrency: usize,
    pub proposal_concurrency: usize,
    /// Jobs with `hourly_rate >= proposal_min_hourly_rate` get a proposal.
    pub proposal_min_hourly_rate: u32,
    pub weights: ScoringWeights,
    pub skill_profile: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            skill_concurrency: 5,
            proposal_concurrency: 2,
            proposal_min_hourly_rate: 3000,
            weights: ScoringWeights::default(),
            skill_profile: crate::llm_client::prompts::DEFAULT_SKILL_PROFILE.to_string(),
        }
    }
}

pub struct Pipeline<'a> {
    cache: &'a dyn ResultCache,
    skill_fit: SkillFitPhase<'a>,
    proposal: ProposalPhase<'a>,
}

impl<'a> Pipeline<'a> {
    /// Builds both phase limiters; a zero concurrency is rejected here.
    pub fn new(
        llm: &'a dyn LlmBackend,
        cache: &'a dyn ResultCache,
        settings: &'a PipelineSettings,
    ) -> Result<Self, LimiterError> {
        Ok(Self {
            cache,
            skill_fit: SkillFitPhase::new(
                llm,
                ConcurrencyLimiter::new(settings.skill_concurrency)?,
                &settings.skill_profile,
                settings.weights,
            ),
            proposal: ProposalPhase::new(
                llm,
                ConcurrencyLimiter::new(settings.proposal_concurrency)?,
                settings.proposal_min_hourly_rate,
            ),
        })
    }

    pub async fn run(&self, jobs: &mut [ScoredJob]) -> Result<PipelineReport, CacheError> {
        let mut entries = self.cache.load().await;

        let skill_fit = self.skill_fit.run(jobs, &mut entries).await;
        if skill_fit.computed() > 0 {
            self.cache.save(&entries).await?;
        }
        info!(
            jobs = jobs.len(),
            cache_hits = skill_fit.cache_hits(),
            llm_calls = skill_fit.llm_calls(),
            failed = skill_fit.failed.len(),
            "Skill-fit phase finished"
        );

        let proposal = self.proposal.run(jobs, &mut entries).await;
        if proposal.computed() > 0 {
            self.cache.save(&entries).await?;
        }
        info!(
            qualifying = proposal.succeeded.len() + proposal.failed.len(),
            cache_hits = proposal.cache_hits(),
            llm_calls = proposal.llm_calls(),
            failed = proposal.failed.len(),
            "Proposal phase finished"
        );

        Ok(PipelineReport {
            skill_fit,
            proposal,
        })
    }
}

/// Splits per-job results into a [`BatchResult`], keeping input order.
pub(crate) fn collect_batch(
    results: Vec<Result<PhaseOutcome, JobFailure>>,
) -> BatchResult<PhaseOutcome> {
    let mut batch = BatchResult::default();
    for result in results {
        match result {
            Ok(outcome) => batch.succeeded.push(outcome),
            Err(failure) => batch.failed.push(failure),
        }
    }
    batch
}
