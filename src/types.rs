//! Core data types for the devpulse triage service
//!
//! This module defines the fundamental data structures used throughout
//! devpulse: normalized activity records, analysis plans, cached suggestions,
//! and webhook bookkeeping. Wire representations use camelCase to match the
//! dashboard client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of platform event an activity was normalized from
///
/// This is a closed taxonomy: events of any other shape are skipped at
/// normalization time rather than surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Pull request opened/closed/merged/review-requested
    PullRequest,

    /// A submitted pull request review
    Review,

    /// An inline review comment on a pull request
    ReviewComment,

    /// A comment on an issue or pull request conversation
    IssueComment,

    /// Issue opened/closed
    Issue,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityKind::PullRequest => "pull_request",
            ActivityKind::Review => "review",
            ActivityKind::ReviewComment => "review_comment",
            ActivityKind::IssueComment => "issue_comment",
            ActivityKind::Issue => "issue",
        };
        write!(f, "{}", s)
    }
}

/// Normalized representation of one platform event
///
/// Immutable once constructed. `priority` and `needs_action` are derived
/// purely from `(kind, action)`, so re-normalizing the same raw event always
/// yields the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Opaque source event id
    pub id: String,

    /// Event kind
    pub kind: ActivityKind,

    /// Platform-specific sub-state ("changes_requested", "opened", ...)
    pub action: String,

    /// Repository in owner/name form
    pub repo: String,

    /// Issue/PR number, absent for comment-only shapes
    pub number: Option<u64>,

    /// Title of the PR or issue, may be empty
    pub title: String,

    /// Author handle
    pub author: String,

    /// Author avatar URL
    pub author_avatar: Option<String>,

    /// Event instant (UTC)
    pub timestamp: DateTime<Utc>,

    /// Deep link into the platform
    pub url: Option<String>,

    /// Free-text excerpt (review/comment body)
    pub body: Option<String>,

    /// Derived priority weight, higher means more urgent
    pub priority: u8,

    /// Whether the developer should act on this item
    pub needs_action: bool,
}

/// Difficulty classification for an analysis plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Easy,
    Normal,
    Hard,
}

/// Status of a single plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started yet (initial state for every generated step)
    Pending,

    /// Marked complete by an explicit update
    Done,
}

/// One actionable step inside an analysis plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    pub text: String,
    pub status: StepStatus,
}

impl Step {
    /// Create a pending step
    pub fn pending(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            status: StepStatus::Pending,
        }
    }
}

/// The AI-or-deterministic "what to do next" plan for one pull request
///
/// Invariant: `steps` is never empty. `error` is populated only when the plan
/// came from the deterministic fallback path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 1-2 sentence human summary of where the PR stands
    pub status_narrative: String,

    /// How hard the remaining work looks
    pub complexity: Complexity,

    /// Ordered actionable steps
    pub steps: Vec<Step>,

    /// Progress toward merge, 0-100
    pub progress_percent: u8,

    /// Failure message when produced by the fallback path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary of a developer's ranked activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    /// One friendly sentence summarizing the batch
    pub summary: String,

    /// Highest-ranked activity, if any
    pub top_priority: Option<Activity>,

    /// One actionable suggestion, never empty
    pub recommendation: String,
}

/// Bookkeeping record for one webhook delivery
///
/// Retained in a bounded ring buffer for observability only; this is not
/// authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecord {
    /// Platform event type header value
    pub event_type: String,

    /// When the delivery arrived (UTC)
    pub received_at: DateTime<Utc>,

    /// Whether dispatch produced any suggestions
    pub processed: bool,

    /// Pull request number, for review events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,

    /// Pull request title, for review events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_title: Option<String>,

    /// Review state ("approved", "changes_requested", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_state: Option<String>,

    /// Reviewer handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,

    /// Comment author handle, for comment events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_author: Option<String>,

    /// One-line suggested next action, for comment events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_action: Option<String>,

    /// Generated plan, for review events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<AnalysisResult>,
}

impl WebhookRecord {
    /// Create an unprocessed record for an event type
    pub fn unprocessed(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            received_at: Utc::now(),
            processed: false,
            pr_number: None,
            pr_title: None,
            review_state: None,
            reviewer: None,
            comment_author: None,
            quick_action: None,
            suggestions: None,
        }
    }
}

/// Render-ready projection of an [`Activity`] for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendActivity {
    pub id: String,
    pub kind: ActivityKind,

    /// Icon name understood by the dashboard icon set
    pub icon: String,

    pub title: String,

    /// "owner/repo#42" style reference
    pub subtitle: String,

    pub author: String,
    pub author_avatar: Option<String>,

    /// Humanized relative timestamp ("2h ago")
    pub time_ago: String,

    /// Display label for the action ("Changes Requested")
    pub action: String,

    /// Tailwind-style color classes for the action badge
    pub action_color: String,

    pub url: Option<String>,
    pub needs_action: bool,

    /// Body excerpt capped at 100 characters
    pub preview: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_result_serializes_camel_case() {
        let result = AnalysisResult {
            status_narrative: "All good".to_string(),
            complexity: Complexity::Easy,
            steps: vec![Step::pending(1, "Merge it")],
            progress_percent: 90,
            error: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["statusNarrative"], "All good");
        assert_eq!(json["complexity"], "easy");
        assert_eq!(json["progressPercent"], 90);
        assert_eq!(json["steps"][0]["status"], "pending");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_activity_kind_display() {
        assert_eq!(ActivityKind::ReviewComment.to_string(), "review_comment");
        assert_eq!(ActivityKind::PullRequest.to_string(), "pull_request");
    }
}
