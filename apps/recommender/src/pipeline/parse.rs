//! Defensive parsers for free-text LLM replies.
//!
//! Replies are expected to contain labelled lines (`SCORE: 8`, `【挨拶】...`),
//! but models drift. Anything missing falls back to a neutral value; these
//! functions never fail.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::scored::NEUTRAL_SKILL_FIT;

#[derive(Debug, Clone, PartialEq)]
pub struct SkillAssessment {
    pub score: f64,
    pub analysis: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalDraft {
    pub greeting: String,
    pub delivery_estimate: String,
    pub questions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProposalSection {
    Greeting,
    Delivery,
    Questions,
}

fn compiled<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Extracts `(score, analysis)` from a skill-fit reply. The score is clamped
/// into 0–10; a missing score is [`NEUTRAL_SKILL_FIT`].
pub fn parse_skill_reply(reply: &str) -> SkillAssessment {
    SkillAssessment {
        score: extract_score(reply)
            .map(|s| s.clamp(0.0, 10.0))
            .unwrap_or(NEUTRAL_SKILL_FIT),
        analysis: extract_analysis(reply),
    }
}

fn extract_score(reply: &str) -> Option<f64> {
    static LABELLED: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    let patterns = [
        compiled(
            &LABELLED,
            r"(?i)(?:score|スコア|評価|点数|適合度)\s*(?:[:：=]|は)?\s*\**\s*(\d+(?:\.\d+)?)",
        ),
        compiled(&BARE, r"(\d+(?:\.\d+)?)\s*(?:/\s*10\b|点)"),
    ];

    patterns
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(reply))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|score| score.is_finite())
}

fn extract_analysis(reply: &str) -> String {
    static LABEL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = compiled(
        &LABEL,
        r"(?i)^\s*[#*\-\s]*[【\[]?\s*(?:analysis|reason|分析|理由|コメント)\s*(?:[】\]]\s*\**\s*[:：]?|\**\s*[:：]|\**\s*$)\s*(.*)$",
    ) else {
        return String::new();
    };

    let mut lines = reply.lines();
    while let Some(line) = lines.next() {
        let Some(rest) = re.captures(line).and_then(|caps| caps.get(1)) else {
            continue;
        };
        let rest = rest.as_str().trim();
        if !rest.is_empty() {
            return rest.to_string();
        }
        // label on its own line: the analysis is the next non-empty line
        return lines
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
    }
    String::new()
}

/// Splits a proposal reply into its three labelled sections. A section runs
/// from its label to the next label; text before the first label is ignored.
pub fn parse_proposal_reply(reply: &str) -> ProposalDraft {
    let mut draft = ProposalDraft::default();
    let mut current: Option<ProposalSection> = None;

    for line in reply.lines() {
        if let Some((section, rest)) = section_header(line) {
            current = Some(section);
            push_line(&mut draft, section, rest);
            continue;
        }
        if let Some(section) = current {
            push_line(&mut draft, section, line);
        }
    }

    draft.greeting = draft.greeting.trim().to_string();
    draft.delivery_estimate = draft.delivery_estimate.trim().to_string();
    draft.questions = draft.questions.trim().to_string();
    draft
}

fn push_line(draft: &mut ProposalDraft, section: ProposalSection, line: &str) {
    let target = match section {
        ProposalSection::Greeting => &mut draft.greeting,
        ProposalSection::Delivery => &mut draft.delivery_estimate,
        ProposalSection::Questions => &mut draft.questions,
    };
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line.trim_end());
}

/// A label only counts as a header when followed by a closing bracket, a
/// colon or the end of the line, so prose like "納品物は…" is not mistaken for one.
fn section_header(line: &str) -> Option<(ProposalSection, &str)> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = compiled(
        &HEADER,
        r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?\s*[【\[]?\s*(greeting|delivery\s+estimate|delivery|questions?|ご?挨拶|提案文|納期目安|納期|納品|質問事項|質問|確認事項)\s*(?:[】\]]\s*(?:\*\*)?\s*[:：]?|(?:\*\*)?\s*[:：]|(?:\*\*)?\s*$)\s*(.*)$",
    )?;
    let caps = re.captures(line)?;
    let label = caps.get(1)?.as_str().to_lowercase();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let section = if label.contains("greet") || label.contains("挨拶") || label.contains("提案") {
        ProposalSection::Greeting
    } else if label.contains("deliver") || label.contains("納") {
        ProposalSection::Delivery
    } else {
        ProposalSection::Questions
    };
    Some((section, rest))
}
