//! Environment configuration for devpulse
//!
//! All runtime configuration comes from the environment: per-provider API
//! keys, the preferred provider identifier, and the webhook shared secret.
//! A missing webhook secret disables signature verification, which is only
//! acceptable for local development.

use crate::error::{DevpulseError, Result};
use std::env;
use tracing::warn;

/// Default port for the HTTP API
pub const DEFAULT_PORT: u16 = 5000;

/// Runtime settings resolved from the environment
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// OpenAI API key, if configured
    pub openai_api_key: Option<String>,

    /// Anthropic API key, if configured
    pub anthropic_api_key: Option<String>,

    /// Google Gemini API key, if configured
    pub gemini_api_key: Option<String>,

    /// Preferred AI provider identifier ("gemini" | "openai" | "anthropic")
    pub preferred_provider: Option<String>,

    /// Shared secret for webhook signature verification
    pub webhook_secret: Option<String>,

    /// Port to bind the HTTP API to
    pub port: u16,
}

/// Read an environment variable, treating empty values as unset
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self> {
        let port = match env_opt("DEVPULSE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                DevpulseError::Config(config::ConfigError::Message(format!(
                    "DEVPULSE_PORT is not a valid port number: {}",
                    raw
                )))
            })?,
            None => DEFAULT_PORT,
        };

        let settings = Self {
            openai_api_key: env_opt("OPENAI_API_KEY"),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            preferred_provider: env_opt("AI_PROVIDER"),
            webhook_secret: env_opt("GITHUB_WEBHOOK_SECRET"),
            port,
        };

        if settings.webhook_secret.is_none() {
            warn!("GITHUB_WEBHOOK_SECRET not set - webhook signature verification is disabled");
        }

        Ok(settings)
    }
}
