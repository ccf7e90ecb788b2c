use serde::{Deserialize, Serialize};

use crate::models::scored::NEUTRAL_SKILL_FIT;

/// Default coefficient for the hourly-rate bucket score.
pub const DEFAULT_HOURLY_WEIGHT: f64 = 1.0;
/// Default coefficient for the workload bucket score.
pub const DEFAULT_WORKLOAD_WEIGHT: f64 = 0.5;
/// Default coefficient for the LLM skill-fit score. Kept the largest of the three.
pub const DEFAULT_SKILL_FIT_WEIGHT: f64 = 2.0;

/// Descending `(minimum JPY/hour, bucket score)` table. Any positive rate
/// below the last threshold scores [`MIN_POSITIVE_RATE_SCORE`].
const HOURLY_RATE_BUCKETS: &[(u32, f64)] = &[
    (4000, 10.0),
    (3500, 9.0),
    (3000, 8.0),
    (2500, 7.0),
    (2000, 6.0),
    (1500, 5.0),
    (1000, 4.0),
    (500, 3.0),
];
const MIN_POSITIVE_RATE_SCORE: f64 = 2.0;

/// Nested `(low, high, bucket score)` hour bands, innermost first.
/// 20–80h is the sweet spot; both shorter and longer engagements score lower.
const WORKLOAD_BANDS: &[(f64, f64, f64)] = &[
    (20.0, 80.0, 10.0),
    (10.0, 120.0, 8.0),
    (5.0, 160.0, 6.0),
    (0.0, 200.0, 4.0),
];
const OUT_OF_BAND_WORKLOAD_SCORE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub hourly: f64,
    pub workload: f64,
    pub skill_fit: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            hourly: DEFAULT_HOURLY_WEIGHT,
            workload: DEFAULT_WORKLOAD_WEIGHT,
            skill_fit: DEFAULT_SKILL_FIT_WEIGHT,
        }
    }
}

impl ScoringWeights {
    /// Highest score reachable with these weights (every input maxed at 10).
    pub fn max_score(&self) -> f64 {
        round_one_decimal(10.0 * (self.hourly + self.workload + self.skill_fit))
    }
}

/// 0–10 score for a JPY hourly rate.
pub fn hourly_rate_bucket(hourly_rate: u32) -> f64 {
    if hourly_rate == 0 {
        return 0.0;
    }
    HOURLY_RATE_BUCKETS
        .iter()
        .find(|(threshold, _)| hourly_rate >= *threshold)
        .map(|(_, score)| *score)
        .unwrap_or(MIN_POSITIVE_RATE_SCORE)
}

/// 0–10 score for an estimated workload in hours.
pub fn workload_bucket(hours: f64) -> f64 {
    WORKLOAD_BANDS
        .iter()
        .find(|(low, high, _)| hours >= *low && hours <= *high)
        .map(|(_, _, score)| *score)
        .unwrap_or(OUT_OF_BAND_WORKLOAD_SCORE)
}

/// Weighted recommendation score, rounded to one decimal place.
///
/// `skill_fit` is expected in 0–10 and is clamped into that range; a
/// non-finite value counts as [`NEUTRAL_SKILL_FIT`].
pub fn score(hourly_rate: u32, workload_hours: f64, skill_fit: f64, weights: &ScoringWeights) -> f64 {
    let skill_fit = if skill_fit.is_finite() {
        skill_fit.clamp(0.0, 10.0)
    } else {
        NEUTRAL_SKILL_FIT
    };
    let raw = hourly_rate_bucket(hourly_rate) * weights.hourly
        + workload_bucket(workload_hours) * weights.workload
        + skill_fit * weights.skill_fit;
    round_one_decimal(raw)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
