//! Input loading and merging.
//!
//! Collections live at `{input_dir}/{platform}/{category}/details.json` and
//! `.../analysis.json`, each a JSON array. Loading is fail-soft: a missing or
//! unreadable file is an empty collection and a record that does not match
//! its schema is skipped.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{
    AnalysisResult, CrowdWorksJobDetail, JobRecord, LancersJobDetail, Platform, SourceAnalysis,
    SourceJobDetail, UpworkJobDetail,
};
use crate::scoring::parse_deadline;

pub const DETAILS_FILE: &str = "details.json";
pub const ANALYSIS_FILE: &str = "analysis.json";

/// One platform/category pair as read from disk.
#[derive(Debug, Clone)]
pub struct SourceCollection {
    pub platform: Platform,
    pub category: String,
    pub details: Vec<SourceJobDetail>,
    pub analyses: Vec<SourceAnalysis>,
}

/// Reads a JSON array of `T`, skipping records that fail to deserialize.
pub async fn load_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Collection not found, treating as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Collection unreadable, treating as empty");
            return Vec::new();
        }
    };

    let raw: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Collection is not a JSON array, treating as empty");
            return Vec::new();
        }
    };

    let total = raw.len();
    let records: Vec<T> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), index, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect();

    if records.len() < total {
        info!(
            path = %path.display(),
            kept = records.len(),
            skipped = total - records.len(),
            "Loaded collection with skipped records"
        );
    }
    records
}

/// Reads a details collection in the platform's own record shape.
pub async fn load_details(platform: Platform, path: &Path) -> Vec<SourceJobDetail> {
    match platform {
        Platform::CrowdWorks => load_collection::<CrowdWorksJobDetail>(path)
            .await
            .into_iter()
            .map(SourceJobDetail::CrowdWorks)
            .collect(),
        Platform::Lancers => load_collection::<LancersJobDetail>(path)
            .await
            .into_iter()
            .map(SourceJobDetail::Lancers)
            .collect(),
        Platform::Upwork => load_collection::<UpworkJobDetail>(path)
            .await
            .into_iter()
            .map(SourceJobDetail::Upwork)
            .collect(),
    }
}

/// Loads every platform/category pair, in the order given.
pub async fn load_sources(
    input_dir: &Path,
    platforms: &[Platform],
    categories: &[String],
) -> Vec<SourceCollection> {
    let mut sources = Vec::with_capacity(platforms.len() * categories.len());
    for &platform in platforms {
        for category in categories {
            let dir = input_dir.join(platform.as_str()).join(category);
            let details = load_details(platform, &dir.join(DETAILS_FILE)).await;
            let analyses = load_collection::<SourceAnalysis>(&dir.join(ANALYSIS_FILE)).await;
            debug!(
                platform = %platform,
                category = %category,
                details = details.len(),
                analyses = analyses.len(),
                "Loaded source collection"
            );
            sources.push(SourceCollection {
                platform,
                category: category.clone(),
                details,
                analyses,
            });
        }
    }
    sources
}

/// Converts one collection into canonical records with prefixed ids.
pub fn normalize_source(source: SourceCollection) -> (Vec<JobRecord>, Vec<AnalysisResult>) {
    let SourceCollection {
        platform,
        category,
        details,
        analyses,
    } = source;

    let jobs = details
        .into_iter()
        .map(|detail| detail.into_record(&category))
        .collect();
    let analyses = analyses
        .into_iter()
        .map(|analysis| analysis.into_result(platform))
        .collect();
    (jobs, analyses)
}

/// Keeps the first occurrence of each `job_id`, preserving order.
pub fn dedup_by_job_id(jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    let before = jobs.len();
    let unique: Vec<JobRecord> = jobs
        .into_iter()
        .filter(|job| seen.insert(job.job_id.clone()))
        .collect();
    if unique.len() < before {
        debug!(dropped = before - unique.len(), "Dropped duplicate job ids");
    }
    unique
}

/// Joins jobs with their analyses across all collections.
///
/// Jobs without an analysis are left out; analyses without a job are ignored.
pub fn merge_sources(sources: Vec<SourceCollection>) -> Vec<(JobRecord, AnalysisResult)> {
    let mut all_jobs = Vec::new();
    let mut analyses: HashMap<String, AnalysisResult> = HashMap::new();

    for source in sources {
        let (jobs, source_analyses) = normalize_source(source);
        all_jobs.extend(jobs);
        for analysis in source_analyses {
            analyses.entry(analysis.job_id.clone()).or_insert(analysis);
        }
    }

    dedup_by_job_id(all_jobs)
        .into_iter()
        .filter_map(|job| match analyses.remove(&job.job_id) {
            Some(analysis) => Some((job, analysis)),
            None => {
                debug!(job_id = %job.job_id, "No analysis for job, skipping");
                None
            }
        })
        .collect()
}

/// A job is active unless it has a parseable deadline strictly before `today`.
pub fn is_active(job: &JobRecord, today: NaiveDate) -> bool {
    job.application_deadline
        .as_deref()
        .and_then(parse_deadline)
        .map_or(true, |deadline| deadline >= today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::job_record;

    fn write(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn test_load_collection_skips_malformed_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        write(
            &path,
            r#"[
                {"jobId": "1", "estimatedHourlyRateText": "3000円"},
                {"nope": true},
                {"id": "2", "hourlyRate": "2000円"}
            ]"#,
        );

        let records: Vec<SourceAnalysis> = load_collection(&path).await;
        let ids: Vec<_> = records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_load_collection_missing_or_invalid_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Vec<SourceAnalysis> = load_collection(&dir.path().join("none.json")).await;
        assert!(missing.is_empty());

        let path = dir.path().join("object.json");
        write(&path, r#"{"jobId": "1"}"#);
        let not_array: Vec<SourceAnalysis> = load_collection(&path).await;
        assert!(not_array.is_empty());
    }

    #[tokio::test]
    async fn test_load_sources_reads_platform_shapes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("crowdworks/web/details.json"),
            r#"[{"jobId": "10", "title": "LP制作", "detailedDescription": "..."}]"#,
        );
        write(
            &dir.path().join("crowdworks/web/analysis.json"),
            r#"[{"jobId": "10", "hourlyRate": "3000円"}]"#,
        );
        write(
            &dir.path().join("upwork/web/details.json"),
            r#"[{"id": "~01ab", "title": "Rust backend", "description": "axum"}]"#,
        );

        let sources = load_sources(
            dir.path(),
            &[Platform::CrowdWorks, Platform::Upwork],
            &["web".to_string(), "ai".to_string()],
        )
        .await;

        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0].details.len(), 1);
        assert_eq!(sources[0].analyses.len(), 1);
        assert!(sources[1].details.is_empty());
        assert_eq!(sources[2].platform, Platform::Upwork);
        assert_eq!(sources[2].details[0].platform(), Platform::Upwork);
    }

    #[test]
    fn test_merge_prefixes_ids_and_drops_unanalysed_jobs() {
        let crowdworks = SourceCollection {
            platform: Platform::CrowdWorks,
            category: "web".to_string(),
            details: vec![
                SourceJobDetail::CrowdWorks(CrowdWorksJobDetail {
                    job_id: "1".to_string(),
                    title: "analysed".to_string(),
                    detailed_description: String::new(),
                    category: None,
                    url: None,
                    application_deadline: None,
                }),
                SourceJobDetail::CrowdWorks(CrowdWorksJobDetail {
                    job_id: "2".to_string(),
                    title: "not analysed".to_string(),
                    detailed_description: String::new(),
                    category: None,
                    url: None,
                    application_deadline: None,
                }),
            ],
            analyses: vec![SourceAnalysis {
                job_id: "1".to_string(),
                estimated_workload_text: "10時間".to_string(),
                estimated_hourly_rate_text: "2500円".to_string(),
                difficulty_text: String::new(),
                summary_text: String::new(),
            }],
        };
        // Same raw id on another platform must not pick up the CrowdWorks analysis.
        let lancers = SourceCollection {
            platform: Platform::Lancers,
            category: "system".to_string(),
            details: vec![SourceJobDetail::Lancers(LancersJobDetail {
                job_id: "1".to_string(),
                title: "lancers one".to_string(),
                description: String::new(),
                category: None,
                url: None,
                deadline: None,
            })],
            analyses: Vec::new(),
        };

        let merged = merge_sources(vec![crowdworks, lancers]);
        assert_eq!(merged.len(), 1);
        let (job, analysis) = &merged[0];
        assert_eq!(job.job_id, "crowdworks:1");
        assert_eq!(job.category, "web");
        assert_eq!(analysis.job_id, "crowdworks:1");
        assert_eq!(analysis.estimated_hourly_rate_text, "2500円");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut second = job_record(Platform::Lancers, "5", "second copy");
        second.category = "ai".to_string();
        let jobs = vec![
            job_record(Platform::Lancers, "5", "first copy"),
            job_record(Platform::Upwork, "5", "other platform"),
            second,
        ];

        let unique = dedup_by_job_id(jobs);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "first copy");
        assert_eq!(unique[1].job_id, "upwork:5");
    }

    #[test]
    fn test_is_active_fails_open() {
        let mut job = job_record(Platform::CrowdWorks, "1", "deadline");
        assert!(is_active(&job, today()));

        job.application_deadline = Some("締切未定".to_string());
        assert!(is_active(&job, today()));

        job.application_deadline = Some("2026年10月16日".to_string());
        assert!(is_active(&job, today()));

        job.application_deadline = Some("2026年10月15日".to_string());
        assert!(!is_active(&job, today()));

        job.application_deadline = Some("2026/11/01".to_string());
        assert!(is_active(&job, today()));
    }
}
