use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Freelance marketplace a job was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    CrowdWorks,
    Lancers,
    Upwork,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::CrowdWorks => "crowdworks",
            Platform::Lancers => "lancers",
            Platform::Upwork => "upwork",
        }
    }

    /// Builds the canonical, collision-free job id for a raw per-platform id.
    pub fn prefixed_id(&self, raw_id: &str) -> String {
        format!("{}:{}", self.as_str(), raw_id.trim())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crowdworks" | "cw" => Ok(Platform::CrowdWorks),
            "lancers" => Ok(Platform::Lancers),
            "upwork" => Ok(Platform::Upwork),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-platform source records (shape produced by each scraper)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdWorksJobDetail {
    pub job_id: String,
    pub title: String,
    #[serde(default)]
    pub detailed_description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// e.g. "2026年10月31日"
    #[serde(default)]
    pub application_deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LancersJobDetail {
    pub job_id: String,
    pub title: String,
    #[serde(default, alias = "detailedDescription")]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "applicationDeadline")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpworkJobDetail {
    #[serde(alias = "jobId")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A scraped job detail, tagged by the platform it came from.
/// Normalized into a [`JobRecord`] at the ingestion boundary.
#[derive(Debug, Clone)]
pub enum SourceJobDetail {
    CrowdWorks(CrowdWorksJobDetail),
    Lancers(LancersJobDetail),
    Upwork(UpworkJobDetail),
}

impl SourceJobDetail {
    pub fn platform(&self) -> Platform {
        match self {
            SourceJobDetail::CrowdWorks(_) => Platform::CrowdWorks,
            SourceJobDetail::Lancers(_) => Platform::Lancers,
            SourceJobDetail::Upwork(_) => Platform::Upwork,
        }
    }

    /// Converts into the canonical record. `fallback_category` is used when the
    /// scraper did not record one (the collection's own category is known).
    pub fn into_record(self, fallback_category: &str) -> JobRecord {
        let platform = self.platform();
        let (raw_id, title, description, category, url, deadline) = match self {
            SourceJobDetail::CrowdWorks(d) => (
                d.job_id,
                d.title,
                d.detailed_description,
                d.category,
                d.url,
                d.application_deadline,
            ),
            SourceJobDetail::Lancers(d) => {
                (d.job_id, d.title, d.description, d.category, d.url, d.deadline)
            }
            SourceJobDetail::Upwork(d) => {
                (d.id, d.title, d.description, d.category, d.url, None)
            }
        };

        JobRecord {
            job_id: platform.prefixed_id(&raw_id),
            platform,
            title,
            detailed_description: description,
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| fallback_category.to_string()),
            url: url.unwrap_or_default(),
            application_deadline: deadline.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Canonical job offer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub platform: Platform,
    pub title: String,
    pub detailed_description: String,
    pub category: String,
    pub url: String,
    pub application_deadline: Option<String>,
}
