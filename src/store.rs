//! Process-wide shared stores: suggestion cache and recent-event log
//!
//! Both stores are constructor-injected, live for the process lifetime, and
//! guard their contents with a `tokio::sync::RwLock`. Callers must not hold
//! a lock across gateway or data-source I/O: fetch and compute first, then
//! acquire the lock only to commit the result.

use crate::types::{AnalysisResult, WebhookRecord};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Freshness window for cached suggestions
pub const FRESHNESS_WINDOW_SECS: i64 = 300;

/// Default capacity of the recent-event ring buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 50;

/// One cached analysis plan with its write instant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSuggestion {
    pub result: AnalysisResult,
    pub updated_at: DateTime<Utc>,
}

/// Cache key for a pull request: `"owner/repo#number"`
pub fn cache_key(repo: &str, number: u64) -> String {
    format!("{}#{}", repo, number)
}

/// Keyed store of analysis results with a freshness window
///
/// Stale entries are retained until overwritten but are never reported as
/// fresh. Writes are last-writer-wins; a reader observes exactly one
/// consistent value per key at any instant.
pub struct SuggestionCache {
    entries: RwLock<HashMap<String, CachedSuggestion>>,
    window: Duration,
}

impl SuggestionCache {
    /// Create a cache with the standard 5-minute freshness window
    pub fn new() -> Self {
        Self::with_window(Duration::seconds(FRESHNESS_WINDOW_SECS))
    }

    /// Create a cache with an explicit freshness window
    pub fn with_window(window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window,
        }
    }

    /// Whether an entry is inside the freshness window
    pub fn is_fresh(&self, entry: &CachedSuggestion) -> bool {
        Utc::now() - entry.updated_at < self.window
    }

    /// Read an entry regardless of freshness (the explicit stale-read path)
    pub async fn get(&self, repo: &str, number: u64) -> Option<CachedSuggestion> {
        let entries = self.entries.read().await;
        entries.get(&cache_key(repo, number)).cloned()
    }

    /// Read an entry only when fresh; fresh reads are what callers may label
    /// as served-from-cache
    pub async fn get_fresh(&self, repo: &str, number: u64) -> Option<AnalysisResult> {
        let entries = self.entries.read().await;
        entries
            .get(&cache_key(repo, number))
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.result.clone())
    }

    /// Store a result for a pull request, stamping the write instant
    pub async fn put(&self, repo: &str, number: u64, result: AnalysisResult) {
        let mut entries = self.entries.write().await;
        entries.insert(
            cache_key(repo, number),
            CachedSuggestion {
                result,
                updated_at: Utc::now(),
            },
        );
    }

    /// Number of cached entries, fresh or stale
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded newest-first log of webhook deliveries
///
/// Observability only, not authoritative state. When at capacity the oldest
/// record is evicted.
pub struct EventLog {
    records: RwLock<VecDeque<WebhookRecord>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a delivery record, evicting the oldest at capacity
    pub async fn record(&self, record: WebhookRecord) {
        let mut records = self.records.write().await;
        records.push_front(record);
        records.truncate(self.capacity);
    }

    /// The newest `limit` records, newest first
    pub async fn recent(&self, limit: usize) -> Vec<WebhookRecord> {
        let records = self.records.read().await;
        records.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ReviewAnalyzer;

    fn plan(narrative: &str) -> AnalysisResult {
        let mut result = ReviewAnalyzer::approved_plan("alice");
        result.status_narrative = narrative.to_string();
        result
    }

    #[tokio::test]
    async fn test_put_then_get_within_window_is_fresh() {
        let cache = SuggestionCache::new();
        cache.put("octocat/hello", 42, plan("cached")).await;

        let fresh = cache.get_fresh("octocat/hello", 42).await.unwrap();
        assert_eq!(fresh.status_narrative, "cached");

        let entry = cache.get("octocat/hello", 42).await.unwrap();
        assert!(cache.is_fresh(&entry));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_elapsed_window_reports_miss_but_keeps_stale_value() {
        // Zero-width window: every entry is stale the instant it is written
        let cache = SuggestionCache::with_window(Duration::zero());
        cache.put("octocat/hello", 42, plan("stale")).await;

        assert!(cache.get_fresh("octocat/hello", 42).await.is_none());

        // The stale value is still retrievable through the explicit path
        let entry = cache.get("octocat/hello", 42).await.unwrap();
        assert_eq!(entry.result.status_narrative, "stale");
        assert!(!cache.is_fresh(&entry));
    }

    #[tokio::test]
    async fn test_miss_on_unknown_key() {
        let cache = SuggestionCache::new();
        assert!(cache.get("octocat/hello", 1).await.is_none());
        assert!(cache.get_fresh("octocat/hello", 1).await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_is_last_writer_wins() {
        let cache = SuggestionCache::new();
        cache.put("octocat/hello", 42, plan("first")).await;
        cache.put("octocat/hello", 42, plan("second")).await;

        let entry = cache.get("octocat/hello", 42).await.unwrap();
        assert_eq!(entry.result.status_narrative, "second");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_ring_buffer_keeps_newest_fifty() {
        let log = EventLog::new(50);

        for i in 0..60 {
            log.record(WebhookRecord::unprocessed(format!("event-{}", i)))
                .await;
        }

        assert_eq!(log.len().await, 50);

        let recent = log.recent(50).await;
        assert_eq!(recent.len(), 50);
        // Newest first: the last delivery leads, the first ten were evicted
        assert_eq!(recent[0].event_type, "event-59");
        assert_eq!(recent[49].event_type, "event-10");
    }

    #[tokio::test]
    async fn test_recent_limits_output() {
        let log = EventLog::default();
        for i in 0..5 {
            log.record(WebhookRecord::unprocessed(format!("event-{}", i)))
                .await;
        }

        let recent = log.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, "event-4");
    }
}
