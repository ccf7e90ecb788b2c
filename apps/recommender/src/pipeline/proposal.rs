//! Phase 2: proposal drafting for well-paid jobs.

use std::future::Future;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheMap};
use crate::limiter::ConcurrencyLimiter;
use crate::llm_client::{LlmBackend, LlmError};
use crate::models::ScoredJob;
use crate::pipeline::parse::{parse_proposal_reply, ProposalDraft};
use crate::pipeline::prompts::{build_proposal_prompt, PROPOSAL_SYSTEM};
use crate::pipeline::{collect_batch, BatchResult, JobFailure, PhaseOutcome, Resolution};

pub struct ProposalPhase<'a> {
    llm: &'a dyn LlmBackend,
    limiter: ConcurrencyLimiter,
    min_hourly_rate: u32,
}

enum Lookup<F> {
    Hit(ProposalDraft),
    Miss(F),
}

impl<'a> ProposalPhase<'a> {
    pub fn new(llm: &'a dyn LlmBackend, limiter: ConcurrencyLimiter, min_hourly_rate: u32) -> Self {
        Self {
            llm,
            limiter,
            min_hourly_rate,
        }
    }

    pub fn qualifies(&self, job: &ScoredJob) -> bool {
        job.hourly_rate >= self.min_hourly_rate
    }

    /// Fills proposal text for qualifying jobs. A cached entry only counts
    /// when its greeting is non-empty; otherwise the proposal is regenerated.
    pub async fn run(
        &self,
        jobs: &mut [ScoredJob],
        entries: &mut CacheMap,
    ) -> BatchResult<PhaseOutcome> {
        let tasks: Vec<_> = jobs
            .iter_mut()
            .filter(|job| self.qualifies(job))
            .map(|job| {
                let lookup = match entries.get(job.job_id()) {
                    Some(entry) if entry.has_proposal() => Lookup::Hit(ProposalDraft {
                        greeting: entry.proposal_greeting.clone(),
                        delivery_estimate: entry.delivery_estimate.clone(),
                        questions: entry.specification_questions.clone(),
                    }),
                    _ => Lookup::Miss(self.request(job)),
                };
                draft(job, lookup)
            })
            .collect();

        let results = join_all(tasks).await;

        let now = Utc::now();
        for (job_id, draft) in results.iter().filter_map(|(_, fresh)| fresh.as_ref()) {
            let entry = entries
                .entry(job_id.clone())
                .or_insert_with(|| CacheEntry::empty(now));
            entry.proposal_greeting = draft.greeting.clone();
            entry.delivery_estimate = draft.delivery_estimate.clone();
            entry.specification_questions = draft.questions.clone();
            entry.processed_at = now;
        }

        collect_batch(results.into_iter().map(|(result, _)| result).collect())
    }

    fn request(&self, job: &ScoredJob) -> impl Future<Output = Result<String, LlmError>> + 'a {
        let prompt = build_proposal_prompt(job);
        let llm = self.llm;
        self.limiter
            .execute(move || async move { llm.complete(&prompt, PROPOSAL_SYSTEM).await })
    }
}

async fn draft<F>(
    job: &mut ScoredJob,
    lookup: Lookup<F>,
) -> (
    Result<PhaseOutcome, JobFailure>,
    Option<(String, ProposalDraft)>,
)
where
    F: Future<Output = Result<String, LlmError>>,
{
    let job_id = job.job_id().to_string();

    let (proposal, resolution) = match lookup {
        Lookup::Hit(cached) => {
            debug!(job_id = %job_id, "Proposal cache hit");
            (cached, Resolution::CacheHit)
        }
        Lookup::Miss(call) => match call.await {
            Ok(reply) => (parse_proposal_reply(&reply), Resolution::Computed),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Proposal generation failed, leaving it empty");
                return (
                    Err(JobFailure {
                        job_id,
                        error: e.to_string(),
                    }),
                    None,
                );
            }
        },
    };

    if resolution == Resolution::Computed && proposal.greeting.is_empty() {
        warn!(job_id = %job_id, "Proposal reply had no greeting section; it will be regenerated next run");
    }

    job.proposal_greeting = proposal.greeting.clone();
    job.delivery_estimate = proposal.delivery_estimate.clone();
    job.specification_questions = proposal.questions.clone();

    let fresh = (resolution == Resolution::Computed).then(|| (job_id.clone(), proposal));
    (
        Ok(PhaseOutcome {
            job_id,
            resolution,
        }),
        fresh,
    )
}
