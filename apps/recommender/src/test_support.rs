//! Shared fixtures for unit tests: a scripted LLM backend and job builders.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llm_client::{LlmBackend, LlmError};
use crate::models::{AnalysisResult, JobRecord, Platform, ScoredJob};
use crate::pipeline::prompts::PROPOSAL_SYSTEM;
use crate::scoring::ScoringWeights;

pub(crate) const DEFAULT_SKILL_REPLY: &str = "SCORE: 5\nANALYSIS: Partial overlap";
pub(crate) const DEFAULT_PROPOSAL_REPLY: &str =
    "GREETING:\nはじめまして。\nDELIVERY:\n2週間\nQUESTIONS:\n1. 既存のコードはありますか？";

/// Replies by job title, read back from the `Title:` line of the prompt.
/// Unscripted titles get a neutral reply.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    skill_replies: HashMap<String, String>,
    proposal_replies: HashMap<String, String>,
    failing_skill: HashSet<String>,
    failing_proposal: HashSet<String>,
    skill_calls: AtomicUsize,
    proposal_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skill(mut self, title: &str, reply: &str) -> Self {
        self.skill_replies.insert(title.to_string(), reply.to_string());
        self
    }

    pub fn proposal(mut self, title: &str, reply: &str) -> Self {
        self.proposal_replies
            .insert(title.to_string(), reply.to_string());
        self
    }

    pub fn fail_skill(mut self, title: &str) -> Self {
        self.failing_skill.insert(title.to_string());
        self
    }

    pub fn fail_proposal(mut self, title: &str) -> Self {
        self.failing_proposal.insert(title.to_string());
        self
    }

    pub fn skill_calls(&self) -> usize {
        self.skill_calls.load(Ordering::SeqCst)
    }

    pub fn proposal_calls(&self) -> usize {
        self.proposal_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.skill_calls() + self.proposal_calls()
    }
}

fn title_of(prompt: &str) -> &str {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Title: "))
        .unwrap_or_default()
        .trim()
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let title = title_of(prompt);
        let (calls, failing, replies, fallback) = if system == PROPOSAL_SYSTEM {
            (
                &self.proposal_calls,
                &self.failing_proposal,
                &self.proposal_replies,
                DEFAULT_PROPOSAL_REPLY,
            )
        } else {
            (
                &self.skill_calls,
                &self.failing_skill,
                &self.skill_replies,
                DEFAULT_SKILL_REPLY,
            )
        };

        calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if failing.contains(title) {
            return Err(LlmError::Api {
                status: 500,
                message: format!("scripted failure for {title}"),
            });
        }
        Ok(replies
            .get(title)
            .cloned()
            .unwrap_or_else(|| fallback.to_string()))
    }
}

pub(crate) fn job_record(platform: Platform, raw_id: &str, title: &str) -> JobRecord {
    JobRecord {
        job_id: platform.prefixed_id(raw_id),
        platform,
        title: title.to_string(),
        detailed_description: format!("{title} の開発をお願いします。"),
        category: "web".to_string(),
        url: format!("https://example.com/{raw_id}"),
        application_deadline: None,
    }
}

pub(crate) fn analysis_for(job: &JobRecord, rate: &str, workload: &str) -> AnalysisResult {
    AnalysisResult {
        job_id: job.job_id.clone(),
        estimated_workload_text: workload.to_string(),
        estimated_hourly_rate_text: rate.to_string(),
        difficulty_text: "普通".to_string(),
        summary_text: format!("{} の概要", job.title),
    }
}

pub(crate) fn scored_job(raw_id: &str, title: &str, rate: &str, workload: &str) -> ScoredJob {
    let job = job_record(Platform::CrowdWorks, raw_id, title);
    let analysis = analysis_for(&job, rate, workload);
    ScoredJob::new(job, analysis, &ScoringWeights::default())
}
