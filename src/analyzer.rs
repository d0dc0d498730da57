//! Review analysis: turning PR feedback into an actionable plan
//!
//! `analyze` never fails. It asks the gateway for a structured plan and
//! substitutes a deterministic one on any gateway, parse, or schema failure,
//! so an upstream outage can never break the caller-facing contract.

use crate::ai::AiGateway;
use crate::error::{DevpulseError, Result};
use crate::extract::extract_structured;
use crate::types::{AnalysisResult, Complexity, Step};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// How many of the most recent reviews feed the prompt
const MAX_REVIEWS: usize = 5;

const ANALYZE_SYSTEM_PROMPT: &str = "\
You are a friendly AI assistant that helps developers understand and act on PR feedback.
Your job is to:
1. Summarize the reviewer's feedback in a casual, encouraging tone (like a helpful teammate)
2. Break down the required changes into clear, actionable steps
3. Prioritize the steps logically (what to do first, second, etc.)

Always be positive and constructive. Use \"we\" language to make developers feel supported.";

const ASK_SYSTEM_PROMPT: &str = "\
You are a friendly AI coding assistant. You help developers understand PR feedback and coding concepts.
Keep responses concise (2-3 sentences max), helpful, and encouraging. Use casual language.
If you don't have enough context, ask clarifying questions.";

/// Wire schema requested from the AI backend
#[derive(Debug, Deserialize)]
struct PlanPayload {
    #[serde(rename = "octoStatus")]
    status: String,
    complexity: Complexity,
    steps: Vec<PlanStep>,
    #[serde(rename = "progressPercent", default)]
    progress_percent: u8,
}

#[derive(Debug, Deserialize)]
struct PlanStep {
    id: u32,
    text: String,
}

/// AI-backed analyzer for pull request reviews
pub struct ReviewAnalyzer {
    gateway: Arc<AiGateway>,
}

impl ReviewAnalyzer {
    pub fn new(gateway: Arc<AiGateway>) -> Self {
        Self { gateway }
    }

    /// Analyze a PR and its reviews into an [`AnalysisResult`]
    ///
    /// Considers at most the 5 most recent reviews. When the latest review is
    /// an approval the plan is fully known without AI input, so the gateway
    /// is bypassed entirely.
    pub async fn analyze(&self, pr: &Value, reviews: &[Value]) -> AnalysisResult {
        let recent = if reviews.len() > MAX_REVIEWS {
            &reviews[reviews.len() - MAX_REVIEWS..]
        } else {
            reviews
        };

        if let Some(latest) = recent.last() {
            if latest.get("state").and_then(Value::as_str) == Some("approved") {
                let reviewer = latest
                    .pointer("/user/login")
                    .and_then(Value::as_str)
                    .unwrap_or("The reviewer");
                debug!("Latest review is an approval, skipping AI analysis");
                return Self::approved_plan(reviewer);
            }
        }

        match self.request_plan(pr, recent).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("AI analysis failed, using fallback plan: {}", e);
                Self::fallback_plan(e.to_string())
            }
        }
    }

    /// Ask the gateway for a structured plan and validate it
    async fn request_plan(&self, pr: &Value, reviews: &[Value]) -> Result<AnalysisResult> {
        let review_content: Vec<String> = reviews
            .iter()
            .map(|r| {
                format!(
                    "Review by {} ({}): {}",
                    r.pointer("/user/login").and_then(Value::as_str).unwrap_or("Reviewer"),
                    r.get("state").and_then(Value::as_str).unwrap_or("unknown"),
                    r.get("body").and_then(Value::as_str).unwrap_or("No comment"),
                )
            })
            .collect();

        let review_text = if review_content.is_empty() {
            "No reviews yet".to_string()
        } else {
            review_content.join("\n\n")
        };

        let user_prompt = format!(
            r#"Analyze this PR and its reviews:

**PR Title:** {}
**PR Description:** {}
**Current State:** {}
**Mergeable:** {}

**Recent Reviews:**
{}

Please respond in this exact JSON format:
{{
  "octoStatus": "A friendly 1-2 sentence summary of what the reviewer wants (casual tone, like explaining to a friend)",
  "complexity": "easy|normal|hard",
  "steps": [
    {{"id": 1, "text": "First actionable step", "status": "pending"}},
    {{"id": 2, "text": "Second actionable step", "status": "pending"}},
    {{"id": 3, "text": "Third actionable step (if needed)", "status": "pending"}}
  ],
  "progressPercent": 0
}}"#,
            pr.get("title").and_then(Value::as_str).unwrap_or("Untitled"),
            pr.get("body").and_then(Value::as_str).unwrap_or("No description provided"),
            pr.get("state").and_then(Value::as_str).unwrap_or("unknown"),
            if pr.get("mergeable").and_then(Value::as_bool).unwrap_or(false) {
                "Yes"
            } else {
                "No"
            },
            review_text,
        );

        let response = self.gateway.complete(ANALYZE_SYSTEM_PROMPT, &user_prompt).await?;
        let payload: PlanPayload = extract_structured(&response)?;

        if payload.steps.is_empty() {
            return Err(DevpulseError::Parse(
                "AI plan contained no steps".to_string(),
            ));
        }

        Ok(AnalysisResult {
            status_narrative: payload.status,
            complexity: payload.complexity,
            steps: payload
                .steps
                .into_iter()
                .map(|s| Step::pending(s.id, s.text))
                .collect(),
            progress_percent: payload.progress_percent.min(100),
            error: None,
        })
    }

    /// Fixed congratulatory plan for an approved review
    ///
    /// A deliberate deterministic short-circuit, not a fallback: the desired
    /// response is fully known without AI input.
    pub fn approved_plan(reviewer: &str) -> AnalysisResult {
        AnalysisResult {
            status_narrative: format!(
                "Great news! {} approved your PR. You're ready to merge! 🎉",
                reviewer
            ),
            complexity: Complexity::Easy,
            steps: vec![
                Step::pending(1, "Double-check any final comments"),
                Step::pending(2, "Squash commits if needed"),
                Step::pending(3, "Merge the PR"),
            ],
            progress_percent: 90,
            error: None,
        }
    }

    /// Deterministic plan used when the AI path fails
    pub fn fallback_plan(error: String) -> AnalysisResult {
        AnalysisResult {
            status_narrative:
                "I'm having trouble analyzing this PR right now. Check back in a moment!"
                    .to_string(),
            complexity: Complexity::Normal,
            steps: vec![
                Step::pending(1, "Review the PR comments manually"),
                Step::pending(2, "Address any requested changes"),
                Step::pending(3, "Request a re-review when ready"),
            ],
            progress_percent: 0,
            error: Some(error),
        }
    }

    /// Free-text question answering with the current PR as context
    ///
    /// No structured parsing; a generic apology replaces the answer when the
    /// gateway is unavailable.
    pub async fn ask(&self, question: &str, context: &Value) -> String {
        let user_prompt = format!(
            "Context about the current PR:\n\
             - Title: {}\n\
             - Status: {}\n\
             - Recent feedback: {}\n\n\
             Developer's question: \"{}\"\n\n\
             Provide a helpful, concise response:",
            context.get("prTitle").and_then(Value::as_str).unwrap_or("Unknown"),
            context.get("status").and_then(Value::as_str).unwrap_or("Unknown"),
            context
                .get("recentFeedback")
                .and_then(Value::as_str)
                .unwrap_or("None"),
            question,
        );

        match self.gateway.complete(ASK_SYSTEM_PROMPT, &user_prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Ask request failed: {}", e);
                "Hmm, I'm having trouble thinking right now. Try asking me again in a moment!"
                    .to_string()
            }
        }
    }
}
