//! Admission guards
//!
//! The defensive checks every inbound telemetry submission must pass
//! before anything is persisted: rate limiting, replay detection, bot
//! scoring and click deduplication. Each guard owns its cache keyspace
//! and its own fail-open policy; composition order is the ingestion
//! orchestrator's job (`rpc::track`).

pub mod bot;
pub mod dedup;
pub mod rate_limit;
pub mod replay;

pub use bot::{BotDetector, BotVerdict};
pub use dedup::DedupGuard;
pub use rate_limit::{RateLimited, RateLimiter};
pub use replay::{ReplayGuard, ReplayRejection};

use actix_web::HttpRequest;

use crate::utils::ip::extract_client_ip;

/// Request signals the guards evaluate. Empty string means the header
/// was absent.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
    pub sec_fetch_mode: String,
}

impl ClientInfo {
    pub fn from_request(req: &HttpRequest, trusted_proxies: &[String]) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };

        Self {
            ip: extract_client_ip(req, trusted_proxies),
            user_agent: header("User-Agent"),
            accept_language: header("Accept-Language"),
            referer: header("Referer"),
            sec_fetch_mode: header("Sec-Fetch-Mode"),
        }
    }
}
