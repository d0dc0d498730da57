//! Batch activity summarization with cost-controlled AI use
//!
//! The common "all caught up" case is answered from a template without
//! touching the gateway; only batches that actually need judgment pay for an
//! AI call, and even those fall back to a count-derived template on failure.

use crate::ai::AiGateway;
use crate::error::Result;
use crate::types::{Activity, ActivitySummary};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// How many ranked activities feed the prompt
const MAX_PROMPT_ACTIVITIES: usize = 10;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful coding assistant. \
Summarize the developer's recent activity in a friendly, concise way.";

/// Wire schema requested from the AI backend
#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
    recommendation: String,
}

/// AI-backed summarizer for ranked activity batches
pub struct ActivitySummarizer {
    gateway: Arc<AiGateway>,
}

impl ActivitySummarizer {
    pub fn new(gateway: Arc<AiGateway>) -> Self {
        Self { gateway }
    }

    /// Summarize a batch of ranked activities
    ///
    /// Expects `activities` in ranked order; the first element becomes
    /// `top_priority`. Never fails and never returns an empty recommendation.
    pub async fn summarize(&self, activities: &[Activity]) -> ActivitySummary {
        if activities.is_empty() {
            return ActivitySummary {
                summary: "No recent activity to report. Time to start something new! 🚀"
                    .to_string(),
                top_priority: None,
                recommendation: "Browse open issues or start a new feature.".to_string(),
            };
        }

        let actionable_count = activities.iter().filter(|a| a.needs_action).count();
        let changes_requested = activities
            .iter()
            .filter(|a| a.action == "changes_requested")
            .count();

        // Small quiet batches don't warrant an AI call
        if activities.len() <= 3 && actionable_count == 0 {
            let noun = if activities.len() == 1 {
                "activity"
            } else {
                "activities"
            };
            return ActivitySummary {
                summary: format!("{} recent {}. Looking good!", activities.len(), noun),
                top_priority: Some(activities[0].clone()),
                recommendation: "Keep up the great work!".to_string(),
            };
        }

        match self
            .request_summary(activities, actionable_count, changes_requested)
            .await
        {
            Ok(payload) => ActivitySummary {
                summary: payload.summary,
                top_priority: Some(activities[0].clone()),
                recommendation: payload.recommendation,
            },
            Err(e) => {
                warn!("AI summary failed, using template: {}", e);
                Self::template_summary(activities, actionable_count)
            }
        }
    }

    /// Ask the gateway for the 2-field summary
    async fn request_summary(
        &self,
        activities: &[Activity],
        actionable_count: usize,
        changes_requested: usize,
    ) -> Result<SummaryPayload> {
        let activity_lines: Vec<String> = activities
            .iter()
            .take(MAX_PROMPT_ACTIVITIES)
            .map(|a| {
                let title: String = a.title.chars().take(50).collect();
                let reference = match a.number {
                    Some(n) => format!("{}#{}", a.repo, n),
                    None => a.repo.clone(),
                };
                format!("- {}: {} on {} \"{}\"", a.kind, a.action, reference, title)
            })
            .collect();

        let user_prompt = format!(
            r#"Recent GitHub activity:
{}

Actionable items: {}
Reviews with changes requested: {}

Provide a JSON response:
{{
  "summary": "One friendly sentence summarizing activity (max 100 chars)",
  "recommendation": "One actionable suggestion (max 80 chars)"
}}"#,
            activity_lines.join("\n"),
            actionable_count,
            changes_requested,
        );

        let response = self
            .gateway
            .complete(SUMMARY_SYSTEM_PROMPT, &user_prompt)
            .await?;
        crate::extract::extract_structured(&response)
    }

    /// Count-derived summary used when the AI path fails
    fn template_summary(activities: &[Activity], actionable_count: usize) -> ActivitySummary {
        ActivitySummary {
            summary: format!(
                "{} activities, {} need your attention.",
                activities.len(),
                actionable_count
            ),
            top_priority: Some(activities[0].clone()),
            recommendation: if actionable_count > 0 {
                "Address the pending review requests first.".to_string()
            } else {
                "All caught up!".to_string()
            },
        }
    }
}
