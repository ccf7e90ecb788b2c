use std::sync::Arc;

use crate::cache::ResultCache;
use crate::llm_client::LlmBackend;
use crate::pipeline::PipelineSettings;
use crate::ranking::ReportSink;

/// Collaborators and settings for one recommender instance, built once in
/// `main` and handed to the driver.
#[derive(Clone)]
pub struct AppState {
    /// Anthropic client in production, a scripted backend in tests.
    pub llm: Arc<dyn LlmBackend>,
    pub cache: Arc<dyn ResultCache>,
    pub sink: Arc<dyn ReportSink>,
    pub settings: PipelineSettings,
}
