//! Webhook verification and event dispatch
//!
//! Every delivery walks Received -> SignatureChecked -> {Rejected |
//! Dispatched} -> Recorded. Only authentication failures surface as errors;
//! dispatch problems are absorbed into a normal acknowledgment so the source
//! platform never retries over a processing-logic bug.

use crate::ai::AiGateway;
use crate::analyzer::ReviewAnalyzer;
use crate::error::{DevpulseError, Result};
use crate::store::{EventLog, SuggestionCache};
use crate::types::WebhookRecord;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const QUICK_ACTION_SYSTEM_PROMPT: &str =
    "Analyze this code review comment and suggest a one-line action item.";

const QUICK_ACTION_FALLBACK: &str = "Review this comment and respond appropriately.";

/// Acknowledgment returned for an accepted delivery
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub message: String,
    pub processed: bool,
}

/// Verify a `sha256=<hex>` signature over the exact payload bytes
///
/// Comparison is constant-time via `Mac::verify_slice`.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(payload);
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Processes inbound webhook deliveries into cached suggestions and records
pub struct WebhookProcessor {
    gateway: Arc<AiGateway>,
    analyzer: ReviewAnalyzer,
    cache: Arc<SuggestionCache>,
    log: Arc<EventLog>,
    secret: Option<String>,
}

impl WebhookProcessor {
    pub fn new(
        gateway: Arc<AiGateway>,
        cache: Arc<SuggestionCache>,
        log: Arc<EventLog>,
        secret: Option<String>,
    ) -> Self {
        Self {
            analyzer: ReviewAnalyzer::new(gateway.clone()),
            gateway,
            cache,
            log,
            secret,
        }
    }

    /// Handle one delivery: verify, dispatch, record
    ///
    /// Fails only with `Auth` on signature verification; everything else is
    /// absorbed into the acknowledgment. A rejected delivery leaves the cache
    /// and the event log untouched.
    pub async fn handle(
        &self,
        event_type: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck> {
        if let Some(secret) = &self.secret {
            let signature = signature
                .ok_or_else(|| DevpulseError::Auth("Missing webhook signature".to_string()))?;
            if !verify_signature(secret, body, signature) {
                return Err(DevpulseError::Auth("Invalid webhook signature".to_string()));
            }
        } else {
            // Local-testing bypass: without a shared secret there is nothing
            // to verify against
            warn!("Accepting unverified webhook delivery (no secret configured)");
        }

        debug!("Received webhook: {}", event_type);

        let (record, message) = match serde_json::from_slice::<Value>(body) {
            Ok(payload) => (
                self.dispatch(event_type, &payload).await,
                "Event processed".to_string(),
            ),
            Err(e) => {
                warn!("Webhook payload is not valid JSON: {}", e);
                (
                    WebhookRecord::unprocessed(event_type),
                    "Event received (processing error logged)".to_string(),
                )
            }
        };

        let processed = record.processed;
        self.log.record(record).await;

        Ok(WebhookAck { message, processed })
    }

    /// Route a verified delivery by event type
    async fn dispatch(&self, event_type: &str, payload: &Value) -> WebhookRecord {
        let mut record = WebhookRecord::unprocessed(event_type);

        match event_type {
            "pull_request_review" => {
                if payload.get("action").and_then(Value::as_str) == Some("submitted") {
                    self.handle_review(payload, &mut record).await;
                }
            }
            "issue_comment" | "pull_request_review_comment" => {
                self.handle_comment(payload, &mut record).await;
            }
            other => {
                debug!("Ignoring webhook event type: {}", other);
            }
        }

        record
    }

    /// Submitted review: analyze (or congratulate) and commit to the cache
    async fn handle_review(&self, payload: &Value, record: &mut WebhookRecord) {
        let review = payload.get("review").cloned().unwrap_or(Value::Null);
        let pr = payload.get("pull_request").cloned().unwrap_or(Value::Null);

        record.processed = true;
        record.pr_number = pr.get("number").and_then(Value::as_u64);
        record.pr_title = pr.get("title").and_then(Value::as_str).map(str::to_string);
        record.review_state = review.get("state").and_then(Value::as_str).map(str::to_string);
        record.reviewer = review
            .pointer("/user/login")
            .and_then(Value::as_str)
            .map(str::to_string);

        let suggestions = match record.review_state.as_deref() {
            Some("changes_requested") => {
                Some(self.analyzer.analyze(&pr, std::slice::from_ref(&review)).await)
            }
            Some("approved") => Some(ReviewAnalyzer::approved_plan(
                record.reviewer.as_deref().unwrap_or("The reviewer"),
            )),
            _ => None,
        };

        let repo = payload
            .pointer("/repository/full_name")
            .and_then(Value::as_str);

        // Analysis happens above without any lock held; only the commit
        // takes the cache write lock
        if let (Some(repo), Some(number), Some(result)) =
            (repo, record.pr_number, suggestions.clone())
        {
            self.cache.put(repo, number, result).await;
            info!("Cached suggestions for {}#{}", repo, number);
        }

        record.suggestions = suggestions;
    }

    /// Issue or review comment: one-line suggested next action
    async fn handle_comment(&self, payload: &Value, record: &mut WebhookRecord) {
        record.processed = true;
        record.comment_author = payload
            .pointer("/comment/user/login")
            .and_then(Value::as_str)
            .map(str::to_string);

        let comment_body = payload
            .pointer("/comment/body")
            .and_then(Value::as_str)
            .unwrap_or("");

        let user_prompt = format!(
            "Comment: \"{}\"\n\nSuggest one clear action in under 15 words:",
            comment_body
        );

        let quick_action = match self
            .gateway
            .complete(QUICK_ACTION_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Quick action generation failed: {}", e);
                QUICK_ACTION_FALLBACK.to_string()
            }
        };

        record.quick_action = Some(quick_action);
    }
}
