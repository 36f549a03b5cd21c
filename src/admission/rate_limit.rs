//! Fixed-window rate limiter
//!
//! Three independent quotas per request over one-minute buckets:
//! per address, per address+user-agent, and (when a tracking identity
//! is already known) per identity+address. Counters live in the shared
//! cache; the first increment of a bucket attaches a 60s TTL so buckets
//! expire on their own. Checks short-circuit in order; a counter whose
//! cache call fails is treated as passing.

use std::sync::Arc;
use std::time::Duration;

use xxhash_rust::xxh64::xxh64;

use crate::cache::{AdmissionCache, CounterOutcome};
use crate::config::RateLimitConfig;

const BUCKET_SECONDS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited;

pub struct RateLimiter {
    cache: Arc<dyn AdmissionCache>,
    quotas: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn AdmissionCache>, quotas: &RateLimitConfig) -> Self {
        Self {
            cache,
            quotas: quotas.clone(),
        }
    }

    pub async fn check(
        &self,
        ip: &str,
        user_agent: &str,
        tracker_id: Option<&str>,
    ) -> Result<(), RateLimited> {
        let bucket = chrono::Utc::now().timestamp() / BUCKET_SECONDS;
        self.check_bucket(bucket, ip, user_agent, tracker_id).await
    }

    async fn check_bucket(
        &self,
        bucket: i64,
        ip: &str,
        user_agent: &str,
        tracker_id: Option<&str>,
    ) -> Result<(), RateLimited> {
        let ip_key = format!("rl:ip:{ip}:{bucket}");
        self.check_counter(&ip_key, self.quotas.per_ip_per_minute)
            .await?;

        let ua_hash = agent_hash(user_agent);
        let ipua_key = format!("rl:ipua:{ip}:{ua_hash}:{bucket}");
        self.check_counter(&ipua_key, self.quotas.per_ip_ua_per_minute)
            .await?;

        if let Some(tracker) = tracker_id {
            let tracker_key = format!("rl:tracker_ip:{tracker}:{ip}:{bucket}");
            self.check_counter(&tracker_key, self.quotas.per_tracker_ip_per_minute)
                .await?;
        }

        Ok(())
    }

    async fn check_counter(&self, key: &str, limit: u32) -> Result<(), RateLimited> {
        let ttl = Duration::from_secs(BUCKET_SECONDS as u64);
        match self.cache.increment_with_ttl(key, ttl).await {
            CounterOutcome::Counted(value) if value > i64::from(limit) => Err(RateLimited),
            CounterOutcome::Counted(_) => Ok(()),
            // fail open: 缓存故障时该计数器视为通过
            CounterOutcome::Unavailable => Ok(()),
        }
    }
}

/// Short fixed-length hash of the user agent, to keep counter keys
/// bounded no matter what the client sends.
pub fn agent_hash(user_agent: &str) -> String {
    format!("{:016x}", xxh64(user_agent.as_bytes(), 0))
}
