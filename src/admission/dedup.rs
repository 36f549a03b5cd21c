//! Click deduplication
//!
//! One marker per (tracker, channel, visitor) tuple. A duplicate within
//! the retention window is acknowledged to the caller but never
//! persisted twice. On cache outage the submission counts as fresh —
//! double-counting beats silently dropping telemetry.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{AdmissionCache, CreateOutcome};
use crate::config::SecurityConfig;

pub struct DedupGuard {
    cache: Arc<dyn AdmissionCache>,
    ttl: Duration,
}

impl DedupGuard {
    pub fn new(cache: Arc<dyn AdmissionCache>, config: &SecurityConfig) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(u64::from(config.dedup_seconds)),
        }
    }

    pub async fn is_duplicate(
        &self,
        tracker_id: &str,
        channel_id: Option<&str>,
        visitor_id: &str,
    ) -> bool {
        let key = format!(
            "dedup:click:{}:{}:{}",
            tracker_id,
            channel_id.unwrap_or(""),
            visitor_id
        );
        matches!(
            self.cache.create_if_absent(&key, self.ttl).await,
            CreateOutcome::Exists
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryAdmissionCache;

    fn guard(cache: Arc<MemoryAdmissionCache>) -> DedupGuard {
        DedupGuard::new(cache, &SecurityConfig {
            dedup_seconds: 30,
            ..SecurityConfig::default()
        })
    }

    #[tokio::test]
    async fn second_submission_is_duplicate() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        let guard = guard(cache);

        assert!(!guard.is_duplicate("trk", Some("ch"), "v1").await);
        assert!(guard.is_duplicate("trk", Some("ch"), "v1").await);
        // 不同 visitor / channel 互不影响
        assert!(!guard.is_duplicate("trk", Some("ch"), "v2").await);
        assert!(!guard.is_duplicate("trk", None, "v1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_expires_after_window() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        let guard = guard(cache);

        assert!(!guard.is_duplicate("trk", Some("ch"), "v1").await);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!guard.is_duplicate("trk", Some("ch"), "v1").await);
    }

    #[tokio::test]
    async fn cache_outage_counts_as_fresh() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        cache.set_unavailable(true);
        let guard = guard(cache);

        assert!(!guard.is_duplicate("trk", Some("ch"), "v1").await);
        assert!(!guard.is_duplicate("trk", Some("ch"), "v1").await);
    }
}
