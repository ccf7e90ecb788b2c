// Shared prompt fragments. Each pipeline phase defines its own templates in
// pipeline/prompts.rs; this file holds the cross-cutting pieces.

/// Appended to every phase prompt; the reply parsers depend on the labels.
pub const LABELLED_OUTPUT_INSTRUCTION: &str = "\
    Answer ONLY with the labelled lines requested. \
    Do NOT use markdown code fences. \
    Do NOT add introductions, apologies or extra commentary.";

/// Skill profile used when no SKILL_PROFILE_PATH is configured.
pub const DEFAULT_SKILL_PROFILE: &str = "\
- Languages: Rust, TypeScript, Python, Go
- Backend: REST/gRPC API design, PostgreSQL, Redis, message queues
- Frontend: React, Next.js
- Cloud: AWS (Lambda, ECS, S3, CDK), Docker, CI/CD
- Data: web scraping (Playwright), ETL, LLM API integration
- Not a fit: design-only work, video editing, data entry, sales";
