//! Event normalization and priority ranking
//!
//! Raw platform events are loosely-typed JSON documents; every field here is
//! read through optional accessors with explicit defaults so a missing nested
//! field can never panic. Events of unrecognized shape are skipped, not
//! surfaced as errors.

use crate::types::{Activity, ActivityKind, FrontendActivity};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Priority weight for a `(kind, action)` pair
///
/// Used both standalone and as the ranker's primary sort key. Anything not in
/// the table defaults to 1.
pub fn priority_for(kind: ActivityKind, action: &str) -> u8 {
    use ActivityKind::*;
    match (kind, action) {
        (Review, "changes_requested") => 10,
        (PullRequest, "review_requested") => 9,
        (ReviewComment, _) => 7,
        (IssueComment, _) => 7,
        (Review, "approved") => 5,
        (PullRequest, "opened") => 4,
        (Issue, "opened") => 3,
        (PullRequest | Issue, "merged") => 3,
        (PullRequest | Issue, "closed") => 2,
        _ => 1,
    }
}

/// Whether a `(kind, action)` pair requires the developer's attention
///
/// Review comments are always actionable; otherwise only a review requesting
/// changes is.
pub fn needs_action_for(kind: ActivityKind, action: &str) -> bool {
    kind == ActivityKind::ReviewComment
        || (kind == ActivityKind::Review && action == "changes_requested")
}

/// Read a string at a JSON pointer path, if present
fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Read an unsigned integer at a JSON pointer path, if present
fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(Value::as_u64)
}

/// Parse an event timestamp, normalizing unparseable values to the Unix epoch
///
/// Falling back to the epoch (rather than the current time) keeps
/// normalization a pure function of its input.
fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Normalize one raw platform event into an [`Activity`]
///
/// Returns `None` for event types outside the known taxonomy. Idempotent:
/// the same raw event always produces the same record.
pub fn normalize(event: &Value) -> Option<Activity> {
    let event_type = event.get("type").and_then(Value::as_str)?;

    let (kind, action, title, number, url, body) = match event_type {
        "PullRequestEvent" => (
            ActivityKind::PullRequest,
            str_at(event, "/payload/action").unwrap_or(""),
            str_at(event, "/payload/pull_request/title"),
            u64_at(event, "/payload/pull_request/number"),
            str_at(event, "/payload/pull_request/html_url"),
            None,
        ),
        "PullRequestReviewEvent" => (
            ActivityKind::Review,
            str_at(event, "/payload/review/state").unwrap_or(""),
            str_at(event, "/payload/pull_request/title"),
            u64_at(event, "/payload/pull_request/number"),
            str_at(event, "/payload/review/html_url"),
            str_at(event, "/payload/review/body"),
        ),
        "PullRequestReviewCommentEvent" => (
            ActivityKind::ReviewComment,
            "commented",
            str_at(event, "/payload/pull_request/title"),
            u64_at(event, "/payload/pull_request/number"),
            str_at(event, "/payload/comment/html_url"),
            str_at(event, "/payload/comment/body"),
        ),
        "IssueCommentEvent" => (
            ActivityKind::IssueComment,
            str_at(event, "/payload/action").unwrap_or("commented"),
            str_at(event, "/payload/issue/title"),
            u64_at(event, "/payload/issue/number"),
            str_at(event, "/payload/comment/html_url"),
            str_at(event, "/payload/comment/body"),
        ),
        "IssuesEvent" => (
            ActivityKind::Issue,
            str_at(event, "/payload/action").unwrap_or(""),
            str_at(event, "/payload/issue/title"),
            u64_at(event, "/payload/issue/number"),
            str_at(event, "/payload/issue/html_url"),
            None,
        ),
        _ => return None,
    };

    let id = event
        .get("id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    Some(Activity {
        id,
        kind,
        action: action.to_string(),
        repo: str_at(event, "/repo/name").unwrap_or("Unknown").to_string(),
        number,
        title: title.unwrap_or("").to_string(),
        author: str_at(event, "/actor/login").unwrap_or("Unknown").to_string(),
        author_avatar: str_at(event, "/actor/avatar_url").map(str::to_string),
        timestamp: parse_timestamp(str_at(event, "/created_at")),
        url: url.map(str::to_string),
        body: body.map(str::to_string),
        priority: priority_for(kind, action),
        needs_action: needs_action_for(kind, action),
    })
}

/// Normalize a batch of raw events, skipping unrecognized shapes
pub fn parse_events(events: &[Value]) -> Vec<Activity> {
    events.iter().filter_map(normalize).collect()
}

/// Total-order activities by priority (desc), then timestamp (newest first)
///
/// The sort is stable, so records with equal keys keep their original
/// relative order.
pub fn rank(mut activities: Vec<Activity>) -> Vec<Activity> {
    activities.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    activities
}

/// Subset of activities requiring immediate attention, in ranked order
pub fn actionable(activities: &[Activity]) -> Vec<Activity> {
    activities
        .iter()
        .filter(|a| a.needs_action || a.priority >= 8)
        .cloned()
        .collect()
}

/// Humanized relative time for display ("2h ago")
fn time_ago(timestamp: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - timestamp).num_seconds().max(0);

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{}d ago", seconds / 86400)
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Icon name for an activity, keyed to the dashboard icon set
fn icon_for(kind: ActivityKind, action: &str) -> &'static str {
    match kind {
        ActivityKind::PullRequest => "GitPullRequest",
        ActivityKind::Review => match action {
            "approved" => "CheckCircle",
            "changes_requested" => "XCircle",
            _ => "MessageSquare",
        },
        ActivityKind::ReviewComment => "MessageSquareCode",
        ActivityKind::IssueComment => "MessageCircle",
        ActivityKind::Issue => "CircleDot",
    }
}

/// Display label for an action value
fn action_label(action: &str) -> String {
    match action {
        "changes_requested" => "Changes Requested".to_string(),
        "approved" => "Approved".to_string(),
        "commented" => "Commented".to_string(),
        "opened" => "Opened".to_string(),
        "closed" => "Closed".to_string(),
        "merged" => "Merged".to_string(),
        "created" => "Created".to_string(),
        other => other.to_string(),
    }
}

/// Badge color classes for an action value
fn action_color(action: &str) -> &'static str {
    match action {
        "changes_requested" => "text-amber-500 bg-amber-500/10",
        "approved" => "text-emerald-500 bg-emerald-500/10",
        "commented" => "text-blue-400 bg-blue-400/10",
        "opened" => "text-green-400 bg-green-400/10",
        "closed" => "text-purple-400 bg-purple-400/10",
        "merged" => "text-violet-500 bg-violet-500/10",
        _ => "text-neutral-400 bg-neutral-400/10",
    }
}

/// Project an activity into its render-ready dashboard form
pub fn format_for_frontend(activity: &Activity) -> FrontendActivity {
    let subtitle = match activity.number {
        Some(n) => format!("{}#{}", activity.repo, n),
        None => activity.repo.clone(),
    };

    let title = if activity.title.is_empty() {
        "Untitled".to_string()
    } else {
        activity.title.clone()
    };

    FrontendActivity {
        id: activity.id.clone(),
        kind: activity.kind,
        icon: icon_for(activity.kind, &activity.action).to_string(),
        title,
        subtitle,
        author: activity.author.clone(),
        author_avatar: activity.author_avatar.clone(),
        time_ago: time_ago(activity.timestamp),
        action: action_label(&activity.action),
        action_color: action_color(&activity.action).to_string(),
        url: activity.url.clone(),
        needs_action: activity.needs_action,
        preview: activity
            .body
            .as_ref()
            .map(|b| b.chars().take(100).collect()),
    }
}
