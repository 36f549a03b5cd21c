//! Anti-replay guard
//!
//! Two checks, cheapest first: the claimed submission timestamp must be
//! within the configured window of now, and the caller-supplied nonce
//! must not have been seen within its retention period. Nonce markers
//! are created atomically (`SET NX EX`); a cache outage admits the
//! request rather than blocking all traffic.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{AdmissionCache, CreateOutcome};
use crate::config::SecurityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayRejection {
    ExpiredTimestamp,
    ReplayDetected,
}

pub struct ReplayGuard {
    cache: Arc<dyn AdmissionCache>,
    window_seconds: i64,
    nonce_ttl: Duration,
}

impl ReplayGuard {
    pub fn new(cache: Arc<dyn AdmissionCache>, config: &SecurityConfig) -> Self {
        Self {
            cache,
            window_seconds: i64::from(config.ts_window_seconds),
            nonce_ttl: Duration::from_secs(u64::from(config.nonce_ttl_seconds)),
        }
    }

    /// Accept or reject a (timestamp, nonce) pair.
    pub async fn check(&self, ts: i64, nonce: &str) -> Result<(), ReplayRejection> {
        let now = chrono::Utc::now().timestamp();
        if !within_window(now, ts, self.window_seconds) {
            return Err(ReplayRejection::ExpiredTimestamp);
        }

        let key = format!("nonce:{nonce}");
        match self.cache.create_if_absent(&key, self.nonce_ttl).await {
            CreateOutcome::Created => Ok(()),
            CreateOutcome::Exists => Err(ReplayRejection::ReplayDetected),
            // fail open: 缓存故障时放行
            CreateOutcome::Unavailable => Ok(()),
        }
    }
}

/// Drift of exactly `window` seconds is still accepted, in both
/// directions.
fn within_window(now: i64, ts: i64, window: i64) -> bool {
    (now - ts).abs() <= window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryAdmissionCache;

    fn guard(cache: Arc<MemoryAdmissionCache>) -> ReplayGuard {
        ReplayGuard::new(cache, &SecurityConfig {
            ts_window_seconds: 300,
            nonce_ttl_seconds: 60,
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn window_boundary_is_inclusive() {
        assert!(within_window(1000, 1000, 300));
        assert!(within_window(1000, 700, 300));
        assert!(within_window(1000, 1300, 300));
        assert!(!within_window(1000, 699, 300));
        assert!(!within_window(1000, 1301, 300));
    }

    #[tokio::test]
    async fn nonce_single_use() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        let guard = guard(cache);
        let now = chrono::Utc::now().timestamp();

        assert_eq!(guard.check(now, "n-1").await, Ok(()));
        assert_eq!(
            guard.check(now, "n-1").await,
            Err(ReplayRejection::ReplayDetected)
        );
        assert_eq!(guard.check(now, "n-2").await, Ok(()));
    }

    #[tokio::test]
    async fn stale_timestamp_rejected_before_nonce_check() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        let guard = guard(cache.clone());
        let stale = chrono::Utc::now().timestamp() - 1000;

        assert_eq!(
            guard.check(stale, "n-old").await,
            Err(ReplayRejection::ExpiredTimestamp)
        );
        // 时间戳被拒时不应消耗 nonce
        let now = chrono::Utc::now().timestamp();
        assert_eq!(guard.check(now, "n-old").await, Ok(()));
    }

    #[tokio::test]
    async fn cache_outage_fails_open() {
        let cache = Arc::new(MemoryAdmissionCache::new());
        cache.set_unavailable(true);
        let guard = guard(cache);
        let now = chrono::Utc::now().timestamp();

        assert_eq!(guard.check(now, "n-1").await, Ok(()));
        assert_eq!(guard.check(now, "n-1").await, Ok(()));
    }
}
