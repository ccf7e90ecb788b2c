//! From raw collections to a ranked, rendered report.

pub mod driver;
pub mod ingest;
pub mod report;

pub use driver::Recommender;
pub use ingest::{
    dedup_by_job_id, is_active, load_collection, load_sources, merge_sources, normalize_source,
    SourceCollection,
};
pub use report::{JsonReportSink, RankedReport, ReportSink};
