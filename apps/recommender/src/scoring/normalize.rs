//! Field normalizers: total functions turning scraped/LLM free text into numbers.
//!
//! None of these fail: unparseable input maps to a documented default.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Workload assumed when no quantifier can be read from the text.
pub const DEFAULT_WORKLOAD_HOURS: f64 = 40.0;
/// Difficulty score for empty or unrecognized labels.
pub const DEFAULT_DIFFICULTY_SCORE: u8 = 5;

pub const EASY_SCORE: u8 = 10;
pub const NORMAL_SCORE: u8 = 6;
pub const HARD_SCORE: u8 = 3;

const HOURS_PER_DAY: f64 = 8.0;
const HOURS_PER_WEEK: f64 = 40.0;
const HOURS_PER_MONTH: f64 = 160.0;

/// Strings the analysis step emits when it could not estimate a rate.
const ZERO_RATE_SENTINELS: &[&str] = &[
    "0円", "0", "不明", "なし", "無し", "算出不可", "n/a", "na", "unknown", "none", "-", "—",
];

const EASY_LABELS: &[&str] = &["easy", "simple", "beginner", "簡単", "易しい", "やさしい", "初級", "低"];
const NORMAL_LABELS: &[&str] = &[
    "normal", "medium", "moderate", "intermediate", "普通", "標準", "中級", "中",
];
const HARD_LABELS: &[&str] = &[
    "hard", "difficult", "advanced", "expert", "難しい", "困難", "上級", "高",
];

/// Compiles `pattern` once. A pattern that fails to compile behaves as "never matches".
fn compiled<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn strip_separators(digits: &str) -> String {
    digits.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Extracts a JPY hourly rate, e.g. `"3,500円"` → 3500.
///
/// The amount attached to a currency marker (円 / yen / JPY suffix, ¥ prefix)
/// wins. A bare amount is accepted only when it is the whole text
/// (`"2500"`); digits elsewhere, such as `"8時間"`, are not a rate. Empty
/// text, "zero" sentinels and text without a marked amount map to 0.
pub fn parse_hourly_rate(text: &str) -> u32 {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    static PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let lowered = trimmed.to_lowercase();
    if ZERO_RATE_SENTINELS.contains(&lowered.as_str()) {
        return 0;
    }

    let candidates = [
        compiled(&SUFFIX, r"(?i)(\d{1,3}(?:[,，]\d{3})+|\d+)\s*(?:円|yen|jpy)"),
        compiled(&PREFIX, r"[¥￥]\s*(\d{1,3}(?:[,，]\d{3})+|\d+)"),
        compiled(&BARE, r"^(\d{1,3}(?:[,，]\d{3})+|\d+)$"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .and_then(|m| strip_separators(m.as_str()).parse::<u32>().ok())
        .unwrap_or(0)
}

/// Converts a workload estimate into hours.
///
/// Quantifiers are tried in order hours → days (×8) → weeks (×40) → months (×160);
/// the first pattern that matches decides, later ones are ignored.
/// Returns [`DEFAULT_WORKLOAD_HOURS`] when nothing matches.
pub fn parse_workload_hours(text: &str) -> f64 {
    static HOURS: OnceLock<Option<Regex>> = OnceLock::new();
    static DAYS: OnceLock<Option<Regex>> = OnceLock::new();
    static WEEKS: OnceLock<Option<Regex>> = OnceLock::new();
    static MONTHS: OnceLock<Option<Regex>> = OnceLock::new();

    let text = text.trim();
    if text.is_empty() {
        return DEFAULT_WORKLOAD_HOURS;
    }

    let rules = [
        (
            compiled(&HOURS, r"(?i)(\d+(?:\.\d+)?)\s*(?:時間|hours?\b|hrs?\b|h\b)"),
            1.0,
        ),
        (
            compiled(&DAYS, r"(?i)(\d+(?:\.\d+)?)\s*(?:日間|日|days?\b)"),
            HOURS_PER_DAY,
        ),
        (
            compiled(&WEEKS, r"(?i)(\d+(?:\.\d+)?)\s*(?:週間|週|weeks?\b)"),
            HOURS_PER_WEEK,
        ),
        (
            compiled(
                &MONTHS,
                r"(?i)(\d+(?:\.\d+)?)\s*(?:ヶ月|か月|カ月|ケ月|ヵ月|箇月|months?\b)",
            ),
            HOURS_PER_MONTH,
        ),
    ];

    for (re, multiplier) in rules {
        let Some(re) = re else { continue };
        if let Some(value) = re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            let hours = value * multiplier;
            return if hours > 0.0 { hours } else { DEFAULT_WORKLOAD_HOURS };
        }
    }

    DEFAULT_WORKLOAD_HOURS
}

/// Maps a qualitative difficulty label to a desirability score.
/// Easier work scores higher: easy 10, normal 6, hard 3, anything else 5.
pub fn parse_difficulty_score(text: &str) -> u8 {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return DEFAULT_DIFFICULTY_SCORE;
    }

    let buckets = [
        (EASY_LABELS, EASY_SCORE),
        (NORMAL_LABELS, NORMAL_SCORE),
        (HARD_LABELS, HARD_SCORE),
    ];
    buckets
        .iter()
        .find(|(labels, _)| labels.iter().any(|label| lowered.contains(label)))
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_DIFFICULTY_SCORE)
}

/// Parses an application deadline such as `"2026年10月31日"`, `"2026-10-31"`
/// or `"2026/10/31"`. Returns `None` for anything else, including impossible dates.
pub fn parse_deadline(text: &str) -> Option<NaiveDate> {
    static DEADLINE: OnceLock<Option<Regex>> = OnceLock::new();

    let re = compiled(
        &DEADLINE,
        r"(\d{4})\s*(?:年|-|/)\s*(\d{1,2})\s*(?:月|-|/)\s*(\d{1,2})",
    )?;
    let caps = re.captures(text)?;
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let day = caps.get(3)?.as_str().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
