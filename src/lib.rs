//! Devpulse - AI-Assisted Code-Review Triage
//!
//! An async HTTP service that turns a developer's code-review activity into
//! actionable guidance:
//! - Normalizes heterogeneous platform events into a uniform activity model
//! - Ranks activity and derives the "needs attention" subset
//! - Generates per-PR action plans through interchangeable AI backends
//! - Falls back to deterministic answers on every AI/network failure
//! - Verifies inbound webhook authenticity and caches expensive results
//!
//! # Architecture
//!
//! The crate is organized into several layers:
//! - **Types**: Core data structures (Activity, AnalysisResult, etc.)
//! - **Activity**: Event normalization and priority ranking
//! - **AI**: Provider gateway with ordered backend selection
//! - **Agents**: Review analyzer and activity summarizer
//! - **Store**: Suggestion cache and recent-event ring buffer
//! - **Webhook**: Signature verification and event dispatch
//! - **API**: axum HTTP surface
//!
//! # Example
//!
//! ```ignore
//! use devpulse::{ApiServer, ApiServerConfig, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let server = ApiServer::new(ApiServerConfig::default(), &settings);
//!     server.serve().await
//! }
//! ```

pub mod activity;
pub mod ai;
pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod github;
pub mod store;
pub mod summarizer;
pub mod types;
pub mod webhook;

// Re-export commonly used types
pub use ai::{AiGateway, CompletionProvider};
pub use analyzer::ReviewAnalyzer;
pub use api::{ApiServer, ApiServerConfig};
pub use config::Settings;
pub use error::{DevpulseError, Result};
pub use github::GithubClient;
pub use store::{CachedSuggestion, EventLog, SuggestionCache};
pub use summarizer::ActivitySummarizer;
pub use types::{
    Activity, ActivityKind, ActivitySummary, AnalysisResult, Complexity, Step, StepStatus,
    WebhookRecord,
};
pub use webhook::WebhookProcessor;
