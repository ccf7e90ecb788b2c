use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::limiter::ConcurrencyLimiter;
use crate::models::{Platform, ScoredJob};
use crate::pipeline::Pipeline;
use crate::ranking::ingest::{is_active, load_sources, merge_sources, SourceCollection};
use crate::ranking::report::RankedReport;
use crate::state::AppState;

/// Where a run reads its input collections from.
#[derive(Debug, Clone)]
pub struct InputSelection {
    pub input_dir: PathBuf,
    pub platforms: Vec<Platform>,
    pub categories: Vec<String>,
}

/// Runs one recommendation batch end to end.
pub struct Recommender {
    state: AppState,
    input: InputSelection,
}

impl Recommender {
    /// Rejects settings the pipeline cannot run with before any work starts.
    pub fn new(state: AppState, input: InputSelection) -> Result<Self, AppError> {
        ConcurrencyLimiter::new(state.settings.skill_concurrency)?;
        ConcurrencyLimiter::new(state.settings.proposal_concurrency)?;
        Ok(Self { state, input })
    }

    /// Load → rank → render, all under one `run_id` span.
    pub async fn run(&self, today: NaiveDate) -> Result<RankedReport, AppError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("recommendation_run", %run_id);

        async {
            let sources = load_sources(
                &self.input.input_dir,
                &self.input.platforms,
                &self.input.categories,
            )
            .await;
            let report = self.rank(run_id, sources, today).await?;
            self.state.sink.render(&report).await?;
            Ok::<_, AppError>(report)
        }
        .instrument(span)
        .await
    }

    /// Merges, filters, scores and orders the given collections.
    pub async fn rank(
        &self,
        run_id: Uuid,
        sources: Vec<SourceCollection>,
        today: NaiveDate,
    ) -> Result<RankedReport, AppError> {
        let settings = &self.state.settings;

        let merged = merge_sources(sources);
        let merged_count = merged.len();
        let mut jobs: Vec<ScoredJob> = merged
            .into_iter()
            .filter(|(job, _)| is_active(job, today))
            .map(|(job, analysis)| ScoredJob::new(job, analysis, &settings.weights))
            .collect();
        info!(
            merged = merged_count,
            active = jobs.len(),
            "Prepared jobs for ranking"
        );

        let pipeline = Pipeline::new(
            self.state.llm.as_ref(),
            self.state.cache.as_ref(),
            settings,
        )?;
        let outcome = pipeline.run(&mut jobs).await?;

        // stable: equal scores keep their load order
        jobs.sort_by(|a, b| b.recommendation_score().total_cmp(&a.recommendation_score()));

        if let Some(best) = jobs.first() {
            info!(
                job_id = %best.job_id(),
                score = best.recommendation_score(),
                "Ranking complete"
            );
        }

        Ok(RankedReport {
            run_id,
            generated_at: Utc::now(),
            jobs,
            skill_fit: outcome.skill_fit,
            proposal: outcome.proposal,
        })
    }
}
