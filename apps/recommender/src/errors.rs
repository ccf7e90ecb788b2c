use thiserror::Error;

use crate::cache::CacheError;
use crate::limiter::LimiterError;

/// Errors that abort a recommendation run.
///
/// Per-job LLM failures never show up here: the pipeline absorbs them and
/// reports them in its batch results instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// A caller broke an API contract (zero concurrency, bad settings).
    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LimiterError> for AppError {
    fn from(err: LimiterError) -> Self {
        AppError::Contract(err.to_string())
    }
}
