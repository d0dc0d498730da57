//! GitHub data source
//!
//! Thin boundary client returning loosely-typed JSON records; all shape
//! interpretation happens in the normalizer and analyzer. Authenticates with
//! the caller-supplied bearer token on every request.

use crate::error::{DevpulseError, Result};
use serde_json::Value;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("devpulse/", env!("CARGO_PKG_VERSION"));

/// Client for the GitHub REST API
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against an explicit base URL (test injection point)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// GET a JSON document from a path under the base URL
    async fn get_json(&self, token: &str, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Fetching {}", path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DevpulseError::Upstream(format!(
                "GitHub API error ({}) for {}",
                response.status(),
                path
            )));
        }

        Ok(response.json().await?)
    }

    /// Events received by the authenticated user, newest first
    ///
    /// The received-events feed is keyed by login, so the login is resolved
    /// through `/user` first.
    pub async fn received_events(&self, token: &str, limit: usize) -> Result<Vec<Value>> {
        let user = self.get_json(token, "/user").await?;
        let login = user
            .get("login")
            .and_then(Value::as_str)
            .ok_or_else(|| DevpulseError::Upstream("GitHub /user returned no login".to_string()))?
            .to_string();

        let events = self
            .get_json(
                token,
                &format!("/users/{}/received_events?per_page={}", login, limit),
            )
            .await?;

        events
            .as_array()
            .cloned()
            .ok_or_else(|| DevpulseError::Upstream("Expected an event array".to_string()))
    }

    /// One pull request record
    pub async fn pull_request(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Value> {
        self.get_json(token, &format!("/repos/{}/{}/pulls/{}", owner, repo, number))
            .await
    }

    /// Reviews for a pull request; degrades to an empty list on failure
    pub async fn reviews(&self, token: &str, owner: &str, repo: &str, number: u64) -> Vec<Value> {
        match self
            .get_json(
                token,
                &format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, number),
            )
            .await
        {
            Ok(Value::Array(reviews)) => reviews,
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("Failed to fetch reviews for {}/{}#{}: {}", owner, repo, number, e);
                Vec::new()
            }
        }
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}
