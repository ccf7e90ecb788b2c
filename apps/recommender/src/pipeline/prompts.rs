// Prompt templates for the two LLM phases. Placeholders are replaced with
// `str::replace` before sending, as `{name}`.

use crate::llm_client::prompts::LABELLED_OUTPUT_INSTRUCTION;
use crate::models::ScoredJob;

/// Longest job description excerpt sent to the model, in characters.
const MAX_DESCRIPTION_CHARS: usize = 3000;

pub const SKILL_FIT_SYSTEM: &str = "You are an experienced technical recruiter judging how well \
    a freelance job matches one engineer's skills. Be strict: a job that needs skills outside \
    the profile scores low even if it pays well.";

/// Replace: {skill_profile}, {title}, {category}, {summary}, {description}
pub const SKILL_FIT_PROMPT_TEMPLATE: &str = r#"ENGINEER SKILL PROFILE:
{skill_profile}

JOB
Title: {title}
Category: {category}
Summary: {summary}
Description:
{description}

Rate how well this job fits the engineer's skills on a 0-10 scale
(10 = every required skill is a core strength, 0 = no overlap).

Answer with exactly two lines:
SCORE: <number 0-10>
ANALYSIS: <one sentence explaining the main matching or missing skills>"#;

pub const PROPOSAL_SYSTEM: &str = "You write concise, polite Japanese proposal messages for a \
    freelance engineer applying to jobs. Never promise skills that are not in the analysis.";

/// Replace: {title}, {description}, {hourly_rate}, {workload_hours}, {skill_analysis}
pub const PROPOSAL_PROMPT_TEMPLATE: &str = r#"JOB
Title: {title}
Estimated hourly rate: {hourly_rate} JPY
Estimated workload: {workload_hours} hours
Description:
{description}

SKILL MATCH NOTES:
{skill_analysis}

Write the application in three labelled sections, each label on its own line:
GREETING:
<3-5 sentence greeting and self-introduction tailored to this job>
DELIVERY:
<realistic delivery estimate>
QUESTIONS:
<2-4 numbered questions that clarify the specification>"#;

pub fn build_skill_fit_prompt(job: &ScoredJob, skill_profile: &str) -> String {
    let prompt = SKILL_FIT_PROMPT_TEMPLATE
        .replace("{skill_profile}", skill_profile)
        .replace("{title}", &job.job.title)
        .replace("{category}", &job.job.category)
        .replace("{summary}", &job.analysis.summary_text)
        .replace(
            "{description}",
            &truncate_chars(&job.job.detailed_description, MAX_DESCRIPTION_CHARS),
        );
    format!("{prompt}\n\n{LABELLED_OUTPUT_INSTRUCTION}")
}

pub fn build_proposal_prompt(job: &ScoredJob) -> String {
    let skill_analysis = if job.skill_analysis.trim().is_empty() {
        "(none)"
    } else {
        job.skill_analysis.as_str()
    };
    let prompt = PROPOSAL_PROMPT_TEMPLATE
        .replace("{title}", &job.job.title)
        .replace("{hourly_rate}", &job.hourly_rate.to_string())
        .replace("{workload_hours}", &job.workload_hours.to_string())
        .replace("{skill_analysis}", skill_analysis)
        .replace(
            "{description}",
            &truncate_chars(&job.job.detailed_description, MAX_DESCRIPTION_CHARS),
        );
    format!("{prompt}\n\n{LABELLED_OUTPUT_INSTRUCTION}")
}

/// Truncates on a char boundary; descriptions are mostly multi-byte Japanese.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
