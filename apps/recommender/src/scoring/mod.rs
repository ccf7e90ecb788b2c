//! Numeric side of the recommender: free-text field normalization and the
//! weighted recommendation score.

pub mod normalize;
pub mod recommendation;

pub use normalize::{
    parse_deadline, parse_difficulty_score, parse_hourly_rate, parse_workload_hours,
    DEFAULT_DIFFICULTY_SCORE, DEFAULT_WORKLOAD_HOURS,
};
pub use recommendation::{hourly_rate_bucket, score, workload_bucket, ScoringWeights};
