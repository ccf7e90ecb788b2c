use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recommender::cache::JsonFileCache;
use recommender::config::Config;
use recommender::llm_client::{self, LlmClient};
use recommender::ranking::{JsonReportSink, Recommender};
use recommender::state::AppState;

/// Jobs echoed to the log after a run.
const TOP_N_LOGGED: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job recommender v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let cache = JsonFileCache::new(&config.cache_path);
    info!("Result cache at {}", cache.path().display());

    let state = AppState {
        llm: Arc::new(llm),
        cache: Arc::new(cache),
        sink: Arc::new(JsonReportSink::new(&config.output_path)),
        settings: config.pipeline_settings(),
    };

    let recommender = Recommender::new(state, config.input_selection())?;
    let report = recommender.run(Local::now().date_naive()).await?;

    info!(
        run_id = %report.run_id,
        jobs = report.jobs.len(),
        skill_llm_calls = report.skill_fit.llm_calls(),
        proposal_llm_calls = report.proposal.llm_calls(),
        failed = report.skill_fit.failed.len() + report.proposal.failed.len(),
        "Run finished, report written to {}",
        config.output_path.display()
    );
    for (rank, job) in report.top(TOP_N_LOGGED).iter().enumerate() {
        info!(
            "#{} [{:.1}] {} ({}円/h, {}h, fit {:.1}) {}",
            rank + 1,
            job.recommendation_score(),
            job.job.title,
            job.hourly_rate,
            job.workload_hours,
            job.skill_fit_score,
            job.job.url
        );
    }

    Ok(())
}
