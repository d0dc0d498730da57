//! HTTP API for webhook ingestion and activity triage
//!
//! Provides:
//! - Webhook endpoint with signature verification
//! - Activity query (normalize + rank + summarize)
//! - On-demand PR analysis with suggestion caching
//! - Free-text question answering
//! - Health and recent-event observability endpoints

pub mod server;

pub use server::{ApiServer, ApiServerConfig};
