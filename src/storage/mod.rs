//! Persistence collaborators
//!
//! The admission pipeline talks to the relational store only through
//! the traits in this module: identity resolution (tokens, sites,
//! targets) and the telemetry sinks (clicks, events). Tests inject
//! in-memory doubles; production wires [`SeaOrmStore`].

mod connection;
mod store;

pub use connection::{connect, run_migrations};
pub use store::SeaOrmStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;

/// A tracking token's identity, resolved from its opaque short code.
/// Read-only to the pipeline; values are copied into records at write
/// time, so deleting a token never rewrites history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub id: String,
    pub short_code: String,
    pub tracker_id: String,
    pub campaign_id: Option<String>,
    pub channel_id: Option<String>,
    pub target_id: String,
    /// "js" or "302"
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    pub id: String,
    pub site_key: String,
    pub domain: String,
}

/// One accepted click, ready to persist. Insert-only.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub ts: DateTime<Utc>,
    pub tracker_id: String,
    pub campaign_id: Option<String>,
    pub channel_id: Option<String>,
    pub target_id: Option<String>,
    pub visitor_id: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub ua: Option<String>,
    pub lang: Option<String>,
    pub referer: Option<String>,
    pub props: Option<serde_json::Value>,
    pub suspected_bot: bool,
    pub is_bot: bool,
}

/// One event of an accepted batch. All events of a batch share `ts`.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub ts: DateTime<Utc>,
    pub site_id: String,
    pub event_type: String,
    pub visitor_id: Option<String>,
    pub session_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub ua: Option<String>,
    pub lang: Option<String>,
    pub props: Option<serde_json::Value>,
    pub suspected_bot: bool,
    pub is_bot: bool,
}

/// Request to mint a new tracking token.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub tracker_id: String,
    pub campaign_id: Option<String>,
    pub channel_id: Option<String>,
    pub target_id: String,
    pub mode: String,
}

#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Map an opaque short code to its tracking identity.
    async fn resolve_token(&self, short_code: &str) -> Result<Option<ResolvedToken>>;
}

#[async_trait]
pub trait SiteResolver: Send + Sync {
    async fn resolve_site(&self, site_key: &str) -> Result<Option<ResolvedSite>>;
}

#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// Destination URL for a target id. Always read from the store,
    /// never trusted from the client.
    async fn target_url(&self, target_id: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait ClickSink: Send + Sync {
    /// Persist one click record, returning its id.
    async fn insert_click(&self, click: NewClick) -> Result<String>;
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist a whole batch as a unit: all rows or an error.
    async fn insert_events(&self, events: Vec<NewEvent>) -> Result<usize>;
}

/// Administrative token surface, separate from the pipeline-facing
/// resolver so test doubles only implement what they exercise.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create_token(&self, token: NewToken) -> Result<ResolvedToken>;
    async fn list_tokens(&self, tracker_id: Option<&str>) -> Result<Vec<ResolvedToken>>;
    /// Returns false when no such token existed.
    async fn delete_token(&self, id: &str) -> Result<bool>;
}
