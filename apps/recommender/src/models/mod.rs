pub mod analysis;
pub mod job;
pub mod scored;

pub use analysis::{AnalysisResult, SourceAnalysis};
pub use job::{
    CrowdWorksJobDetail, JobRecord, LancersJobDetail, Platform, SourceJobDetail, UpworkJobDetail,
};
pub use scored::ScoredJob;
