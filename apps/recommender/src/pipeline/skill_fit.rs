//! Phase 1: skill-fit evaluation for every job in the batch.

use std::future::Future;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheMap};
use crate::limiter::ConcurrencyLimiter;
use crate::llm_client::{LlmBackend, LlmError};
use crate::models::scored::NEUTRAL_SKILL_FIT;
use crate::models::ScoredJob;
use crate::pipeline::parse::{parse_skill_reply, SkillAssessment};
use crate::pipeline::prompts::{build_skill_fit_prompt, SKILL_FIT_SYSTEM};
use crate::pipeline::{collect_batch, BatchResult, JobFailure, PhaseOutcome, Resolution};
use crate::scoring::ScoringWeights;

pub struct SkillFitPhase<'a> {
    llm: &'a dyn LlmBackend,
    limiter: ConcurrencyLimiter,
    skill_profile: &'a str,
    weights: ScoringWeights,
}

enum Lookup<F> {
    Hit(SkillAssessment),
    Miss(F),
}

impl<'a> SkillFitPhase<'a> {
    pub fn new(
        llm: &'a dyn LlmBackend,
        limiter: ConcurrencyLimiter,
        skill_profile: &'a str,
        weights: ScoringWeights,
    ) -> Self {
        Self {
            llm,
            limiter,
            skill_profile,
            weights,
        }
    }

    /// Sets `skill_fit_score` on every job, from the cache when present and
    /// from the LLM otherwise, rescoring each job as soon as its score lands.
    /// Fresh results are written into `entries`.
    pub async fn run(
        &self,
        jobs: &mut [ScoredJob],
        entries: &mut CacheMap,
    ) -> BatchResult<PhaseOutcome> {
        let weights = self.weights;

        // LLM calls are submitted to the limiter here, in job order.
        let tasks: Vec<_> = jobs
            .iter_mut()
            .map(|job| {
                let lookup = match entries.get(job.job_id()) {
                    Some(CacheEntry {
                        skill_fit_score: Some(score),
                        skill_analysis,
                        ..
                    }) => Lookup::Hit(SkillAssessment {
                        score: *score,
                        analysis: skill_analysis.clone(),
                    }),
                    _ => Lookup::Miss(self.request(job)),
                };
                evaluate(job, lookup, weights)
            })
            .collect();

        let results = join_all(tasks).await;

        let now = Utc::now();
        for (job_id, assessment) in results.iter().filter_map(|(_, fresh)| fresh.as_ref()) {
            let entry = entries
                .entry(job_id.clone())
                .or_insert_with(|| CacheEntry::empty(now));
            entry.skill_fit_score = Some(assessment.score);
            entry.skill_analysis = assessment.analysis.clone();
            entry.processed_at = now;
        }

        collect_batch(results.into_iter().map(|(result, _)| result).collect())
    }

    fn request(&self, job: &ScoredJob) -> impl Future<Output = Result<String, LlmError>> + 'a {
        let prompt = build_skill_fit_prompt(job, self.skill_profile);
        let llm = self.llm;
        self.limiter
            .execute(move || async move { llm.complete(&prompt, SKILL_FIT_SYSTEM).await })
    }
}

/// Resolves one job. Returns the outcome plus the assessment to cache, if a
/// fresh one was obtained.
async fn evaluate<F>(
    job: &mut ScoredJob,
    lookup: Lookup<F>,
    weights: ScoringWeights,
) -> (
    Result<PhaseOutcome, JobFailure>,
    Option<(String, SkillAssessment)>,
)
where
    F: Future<Output = Result<String, LlmError>>,
{
    let job_id = job.job_id().to_string();

    match lookup {
        Lookup::Hit(cached) => {
            debug!(job_id = %job_id, score = cached.score, "Skill-fit cache hit");
            job.apply_skill_fit(cached.score, cached.analysis, &weights);
            (
                Ok(PhaseOutcome {
                    job_id,
                    resolution: Resolution::CacheHit,
                }),
                None,
            )
        }
        Lookup::Miss(call) => match call.await {
            Ok(reply) => {
                let assessment = parse_skill_reply(&reply);
                job.apply_skill_fit(assessment.score, assessment.analysis.clone(), &weights);
                (
                    Ok(PhaseOutcome {
                        job_id: job_id.clone(),
                        resolution: Resolution::Computed,
                    }),
                    Some((job_id, assessment)),
                )
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Skill-fit evaluation failed, keeping neutral score");
                job.apply_skill_fit(NEUTRAL_SKILL_FIT, String::new(), &weights);
                (
                    Err(JobFailure {
                        job_id,
                        error: e.to_string(),
                    }),
                    None,
                )
            }
        },
    }
}
