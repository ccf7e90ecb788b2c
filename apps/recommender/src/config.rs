use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::llm_client::prompts::DEFAULT_SKILL_PROFILE;
use crate::models::Platform;
use crate::pipeline::PipelineSettings;
use crate::ranking::driver::InputSelection;
use crate::scoring::recommendation::{
    DEFAULT_HOURLY_WEIGHT, DEFAULT_SKILL_FIT_WEIGHT, DEFAULT_WORKLOAD_WEIGHT,
};
use crate::scoring::ScoringWeights;

const DEFAULT_PLATFORMS: &str = "crowdworks,lancers,upwork";
const DEFAULT_CATEGORIES: &str = "web,system,app,ai,ec";

/// Application configuration loaded from environment variables.
/// Fails at startup if a required variable is missing or a value is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub input_dir: PathBuf,
    pub platforms: Vec<Platform>,
    pub categories: Vec<String>,
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    pub skill_concurrency: usize,
    pub proposal_concurrency: usize,
    pub proposal_min_hourly_rate: u32,
    pub weights: ScoringWeights,
    pub skill_profile: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let skill_profile = match std::env::var("SKILL_PROFILE_PATH") {
            Ok(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read skill profile from '{path}'"))?,
            Err(_) => DEFAULT_SKILL_PROFILE.to_string(),
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            input_dir: env_or("INPUT_DIR", "data").into(),
            platforms: parse_list(&env_or("PLATFORMS", DEFAULT_PLATFORMS))
                .into_iter()
                .map(|p| Platform::from_str(&p).map_err(anyhow::Error::msg))
                .collect::<Result<_>>()
                .context("PLATFORMS must list crowdworks, lancers or upwork")?,
            categories: parse_list(&env_or("CATEGORIES", DEFAULT_CATEGORIES)),
            cache_path: env_or("CACHE_PATH", "cache/recommendations.json").into(),
            output_path: env_or("OUTPUT_PATH", "output/ranked_jobs.json").into(),
            skill_concurrency: parse_env("SKILL_CONCURRENCY", 5)?,
            proposal_concurrency: parse_env("PROPOSAL_CONCURRENCY", 2)?,
            proposal_min_hourly_rate: parse_env("PROPOSAL_MIN_HOURLY_RATE", 3000)?,
            weights: check_weights(ScoringWeights {
                hourly: parse_weight("WEIGHT_HOURLY", DEFAULT_HOURLY_WEIGHT)?,
                workload: parse_weight("WEIGHT_WORKLOAD", DEFAULT_WORKLOAD_WEIGHT)?,
                skill_fit: parse_weight("WEIGHT_SKILL_FIT", DEFAULT_SKILL_FIT_WEIGHT)?,
            })?,
            skill_profile,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            skill_concurrency: self.skill_concurrency,
            proposal_concurrency: self.proposal_concurrency,
            proposal_min_hourly_rate: self.proposal_min_hourly_rate,
            weights: self.weights,
            skill_profile: self.skill_profile.clone(),
        }
    }

    pub fn input_selection(&self) -> InputSelection {
        InputSelection {
            input_dir: self.input_dir.clone(),
            platforms: self.platforms.clone(),
            categories: self.categories.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_weight(key: &str, default: f64) -> Result<f64> {
    let weight = parse_env(key, default)?;
    if !weight.is_finite() || weight < 0.0 {
        bail!("{key} must be a finite, non-negative number (got {weight})");
    }
    Ok(weight)
}

/// Skill fit must weigh at least as much as either other component.
fn check_weights(weights: ScoringWeights) -> Result<ScoringWeights> {
    if weights.skill_fit < weights.hourly.max(weights.workload) {
        bail!(
            "WEIGHT_SKILL_FIT ({}) must not be smaller than WEIGHT_HOURLY ({}) or WEIGHT_WORKLOAD ({})",
            weights.skill_fit,
            weights.hourly,
            weights.workload
        );
    }
    Ok(weights)
}

/// Splits a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
