//! Bot likelihood scoring
//!
//! A heuristic score in [0, 100] computed from request signals plus a
//! short-lived per-address hit counter. Classification against the
//! configured thresholds yields a (blocked, suspected) verdict; whether
//! "blocked" rejects the request or only flags the stored record is the
//! orchestrator's decision.

use std::sync::Arc;
use std::time::Duration;

use super::ClientInfo;
use crate::cache::{AdmissionCache, CounterOutcome};
use crate::config::BotConfig;

/// Substrings of automation tools in lower-cased user agents.
const AUTOMATION_UA_PATTERNS: [&str; 10] = [
    "bot",
    "spider",
    "crawler",
    "headless",
    "phantom",
    "selenium",
    "puppeteer",
    "scrapy",
    "wget",
    "curl",
];

/// Hit-frequency counters expire quickly; they measure bursts, not
/// history.
const FREQUENCY_TTL: Duration = Duration::from_secs(10);
const FREQUENCY_SUSPICION_FLOOR: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotVerdict {
    pub score: u8,
    pub suspected: bool,
    pub blocked: bool,
}

/// Score the request signals. Pure function; the recent-hit count is
/// the only state-derived input.
pub fn score(
    user_agent: &str,
    accept_language: &str,
    sec_fetch_mode: &str,
    referer: &str,
    recent_hits: i64,
) -> u8 {
    let mut score: u32 = 0;
    let ua_lower = user_agent.to_lowercase();

    // 命中一个自动化工具特征即加分，不叠加
    if AUTOMATION_UA_PATTERNS
        .iter()
        .any(|p| ua_lower.contains(p))
    {
        score += 50;
    }

    if accept_language.is_empty() {
        score += 20;
    }

    if sec_fetch_mode.is_empty() {
        score += 20;
    }

    if referer.is_empty() && recent_hits > FREQUENCY_SUSPICION_FLOOR {
        score += 30;
    }

    score.min(100) as u8
}

/// Map a score onto the configured thresholds.
pub fn classify(score: u8, config: &BotConfig) -> (bool, bool) {
    if score >= config.block_threshold {
        (true, true)
    } else if score >= config.mark_threshold {
        (false, true)
    } else {
        (false, false)
    }
}

pub struct BotDetector {
    cache: Arc<dyn AdmissionCache>,
    config: BotConfig,
}

impl BotDetector {
    pub fn new(cache: Arc<dyn AdmissionCache>, config: &BotConfig) -> Self {
        Self {
            cache,
            config: config.clone(),
        }
    }

    /// Count this request against the caller's short-lived frequency
    /// counter. 0 on cache outage (fail open: no frequency suspicion).
    pub async fn count_recent_hits(&self, ip: &str) -> i64 {
        let key = format!("bot:freq:{ip}");
        match self.cache.increment_with_ttl(&key, FREQUENCY_TTL).await {
            CounterOutcome::Counted(value) => value,
            CounterOutcome::Unavailable => 0,
        }
    }

    /// Full assessment of one submission. `referer` is passed
    /// explicitly because the batched-event path scores without one.
    pub async fn assess(&self, client: &ClientInfo, referer: &str) -> BotVerdict {
        let recent_hits = self.count_recent_hits(&client.ip).await;
        let score = score(
            &client.user_agent,
            &client.accept_language,
            &client.sec_fetch_mode,
            referer,
            recent_hits,
        );
        let (blocked, suspected) = classify(score, &self.config);
        BotVerdict {
            score,
            suspected,
            blocked,
        }
    }
}
