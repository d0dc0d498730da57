//! HTTP API server

use crate::activity::{self, format_for_frontend};
use crate::ai::AiGateway;
use crate::analyzer::ReviewAnalyzer;
use crate::config::Settings;
use crate::error::DevpulseError;
use crate::github::GithubClient;
use crate::store::{CachedSuggestion, EventLog, SuggestionCache};
use crate::summarizer::ActivitySummarizer;
use crate::types::{ActivitySummary, AnalysisResult, FrontendActivity, WebhookRecord};
use crate::webhook::WebhookProcessor;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Recent-event ring buffer capacity
    pub event_capacity: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], crate::config::DEFAULT_PORT).into(),
            event_capacity: crate::store::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// API server state shared across handlers
#[derive(Clone)]
struct AppState {
    gateway: Arc<AiGateway>,
    github: Arc<GithubClient>,
    cache: Arc<SuggestionCache>,
    events: Arc<EventLog>,
    webhook: Arc<WebhookProcessor>,
    analyzer: Arc<ReviewAnalyzer>,
    summarizer: Arc<ActivitySummarizer>,
    webhook_configured: bool,
    instance_id: String,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a server wired from environment settings
    pub fn new(config: ApiServerConfig, settings: &Settings) -> Self {
        let gateway = Arc::new(AiGateway::from_settings(settings));
        Self::with_components(
            config,
            gateway,
            Arc::new(GithubClient::new()),
            settings.webhook_secret.clone(),
        )
    }

    /// Create a server from explicit collaborators (test injection point)
    pub fn with_components(
        config: ApiServerConfig,
        gateway: Arc<AiGateway>,
        github: Arc<GithubClient>,
        webhook_secret: Option<String>,
    ) -> Self {
        let cache = Arc::new(SuggestionCache::new());
        let events = Arc::new(EventLog::new(config.event_capacity));
        let webhook = Arc::new(WebhookProcessor::new(
            gateway.clone(),
            cache.clone(),
            events.clone(),
            webhook_secret.clone(),
        ));
        let instance_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        let state = AppState {
            analyzer: Arc::new(ReviewAnalyzer::new(gateway.clone())),
            summarizer: Arc::new(ActivitySummarizer::new(gateway.clone())),
            gateway,
            github,
            cache,
            events,
            webhook,
            webhook_configured: webhook_secret.is_some(),
            instance_id,
        };

        Self { config, state }
    }

    /// Build the router over this server's state
    pub fn router(&self) -> Router {
        Self::build_router(self.state.clone())
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            // Webhook ingestion
            .route("/webhook", post(webhook_handler))
            // Agent endpoints
            .route("/api/agent/activity", get(activity_handler))
            .route("/api/agent/analyze-pr", post(analyze_pr_handler))
            .route("/api/agent/ask", post(ask_handler))
            .route(
                "/api/agent/suggestions/:owner/:repo/:number",
                get(suggestions_handler),
            )
            .route("/api/agent/recent-events", get(recent_events_handler))
            // Health check
            .route("/api/agent/health", get(health_handler))
            // State
            .with_state(state)
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving with dynamic port allocation
    ///
    /// Tries the configured address first, then attempts alternative ports
    /// if the primary port is unavailable.
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state.clone());

        match tokio::net::TcpListener::bind(self.config.addr).await {
            Ok(listener) => {
                info!(
                    "devpulse [{}] listening on http://{}",
                    self.state.instance_id, self.config.addr
                );
                axum::serve(listener, router).await?;
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(
                    "Port {} in use, trying alternative ports...",
                    self.config.addr.port()
                );
            }
            Err(e) => return Err(e.into()),
        }

        let base_port = self.config.addr.port();
        for offset in 1..=10 {
            let alt_addr = SocketAddr::new(self.config.addr.ip(), base_port + offset);

            match tokio::net::TcpListener::bind(alt_addr).await {
                Ok(listener) => {
                    info!(
                        "devpulse [{}] listening on http://{}",
                        self.state.instance_id, alt_addr
                    );
                    axum::serve(listener, router).await?;
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(anyhow::anyhow!(
            "All ports ({}-{}) are in use",
            base_port,
            base_port + 10
        ))
    }
}

/// Error response wrapper mapping domain errors onto HTTP statuses
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DevpulseError> for ApiError {
    fn from(err: DevpulseError) -> Self {
        let status = match &err {
            DevpulseError::Validation(_) => StatusCode::BAD_REQUEST,
            DevpulseError::Auth(_) => StatusCode::UNAUTHORIZED,
            DevpulseError::Upstream(_) | DevpulseError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Extract a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Webhook ingestion handler
///
/// Always acknowledges with 200 once the signature checks out; 401 is
/// reserved for verification failure.
async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    match state.webhook.handle(event_type, &body, signature).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResponse {
    activities: Vec<FrontendActivity>,
    actionable: Vec<FrontendActivity>,
    summary: ActivitySummary,
    total: usize,
}

/// Activity query handler: fetch, normalize, rank, summarize
async fn activity_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "GitHub token required"))?;
    let limit = query.limit.unwrap_or(30);

    let events = state.github.received_events(token, limit).await?;
    let ranked = activity::rank(activity::parse_events(&events));
    let actionable = activity::actionable(&ranked);
    let summary = state.summarizer.summarize(&ranked).await;

    Ok(Json(ActivityResponse {
        activities: ranked.iter().take(20).map(format_for_frontend).collect(),
        actionable: actionable.iter().map(format_for_frontend).collect(),
        summary,
        total: ranked.len(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzePrRequest {
    token: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
    pr_number: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzePrResponse {
    #[serde(flatten)]
    result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pr_title: Option<String>,
    pr_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pr_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pr_url: Option<String>,
    repo: String,
    updated_at: DateTime<Utc>,
    from_cache: bool,
}

/// On-demand PR analysis handler
///
/// A fresh cache hit short-circuits the fetch and the AI call; otherwise the
/// analysis is computed without any lock held and then committed to the cache.
async fn analyze_pr_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzePrRequest>,
) -> Result<Json<AnalyzePrResponse>, ApiError> {
    let (Some(token), Some(owner), Some(repo), Some(pr_number)) =
        (req.token, req.owner, req.repo, req.pr_number)
    else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Missing required fields: token, owner, repo, prNumber",
        ));
    };

    let repo_full = format!("{}/{}", owner, repo);

    if let Some(entry) = state.cache.get(&repo_full, pr_number).await {
        if state.cache.is_fresh(&entry) {
            debug!("Serving cached suggestions for {}#{}", repo_full, pr_number);
            return Ok(Json(AnalyzePrResponse {
                result: entry.result,
                pr_title: None,
                pr_number,
                pr_state: None,
                pr_url: None,
                repo: repo_full,
                updated_at: entry.updated_at,
                from_cache: true,
            }));
        }
    }

    let pr = state
        .github
        .pull_request(&token, &owner, &repo, pr_number)
        .await?;
    let reviews = state.github.reviews(&token, &owner, &repo, pr_number).await;

    let result = state.analyzer.analyze(&pr, &reviews).await;
    state.cache.put(&repo_full, pr_number, result.clone()).await;

    Ok(Json(AnalyzePrResponse {
        pr_title: pr.get("title").and_then(Value::as_str).map(str::to_string),
        pr_number,
        pr_state: pr.get("state").and_then(Value::as_str).map(str::to_string),
        pr_url: pr.get("html_url").and_then(Value::as_str).map(str::to_string),
        repo: repo_full,
        updated_at: Utc::now(),
        from_cache: false,
        result,
    }))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: Option<String>,
    #[serde(default)]
    context: Value,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    response: String,
}

/// Free-text question handler
async fn ask_handler(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = req
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Question is required"))?;

    let response = state.analyzer.ask(&question, &req.context).await;
    Ok(Json(AskResponse { response }))
}

/// Cached suggestions handler (serves stale entries too)
async fn suggestions_handler(
    State(state): State<AppState>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Result<Json<CachedSuggestion>, ApiError> {
    let repo_full = format!("{}/{}", owner, repo);

    state
        .cache
        .get(&repo_full, number)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "No cached suggestions found"))
}

#[derive(Debug, Serialize)]
struct RecentEventsResponse {
    events: Vec<WebhookRecord>,
    total: usize,
}

/// Recent webhook deliveries, newest first (for debugging/monitoring)
async fn recent_events_handler(State(state): State<AppState>) -> Json<RecentEventsResponse> {
    Json(RecentEventsResponse {
        events: state.events.recent(20).await,
        total: state.events.len().await,
    })
}

/// Health check handler
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    ai_configured: bool,
    ai_provider: String,
    webhook_configured: bool,
    cached_suggestions: usize,
    recent_events_count: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ai_configured: state.gateway.is_configured(),
        ai_provider: state.gateway.active_provider().to_string(),
        webhook_configured: state.webhook_configured,
        cached_suggestions: state.cache.len().await,
        recent_events_count: state.events.len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server() -> ApiServer {
        ApiServer::with_components(
            ApiServerConfig::default(),
            Arc::new(AiGateway::with_providers(vec![])),
            Arc::new(GithubClient::new()),
            None,
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = test_server();
        let response = health_handler(State(server.state.clone())).await;

        assert_eq!(response.0.status, "ok");
        assert!(!response.0.ai_configured);
        assert_eq!(response.0.ai_provider, "none");
        assert!(!response.0.webhook_configured);
        assert_eq!(response.0.cached_suggestions, 0);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, "Bearer gho_abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("gho_abc"));

        headers.insert(AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        let e = ApiError::from(DevpulseError::Validation("missing".to_string()));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e = ApiError::from(DevpulseError::Auth("bad signature".to_string()));
        assert_eq!(e.status, StatusCode::UNAUTHORIZED);

        let e = ApiError::from(DevpulseError::Upstream("github down".to_string()));
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
    }
}
