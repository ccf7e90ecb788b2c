pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod llm_client;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod scoring;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
