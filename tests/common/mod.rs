//! Shared test doubles: an in-memory store implementing every
//! persistence collaborator, plus helpers to build a pipeline and seal
//! submissions the way the browser SDK does.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use trackgate::admission::ClientInfo;
use trackgate::cache::MemoryAdmissionCache;
use trackgate::config::AppConfig;
use trackgate::errors::{Result, TrackgateError};
use trackgate::rpc::TrackPipeline;
use trackgate::security::{ServiceKeys, encrypt_envelope};
use trackgate::services::geoip::GeoIpProvider;
use trackgate::storage::{
    ClickSink, EventSink, NewClick, NewEvent, NewToken, ResolvedSite, ResolvedToken, SiteResolver,
    TargetResolver, TokenResolver, TokenStore,
};

/// In-memory implementation of all persistence collaborators.
#[derive(Default)]
pub struct MemoryStore {
    pub tokens: Mutex<Vec<ResolvedToken>>,
    pub sites: Mutex<Vec<ResolvedSite>>,
    pub targets: Mutex<HashMap<String, String>>,
    pub clicks: Mutex<Vec<NewClick>>,
    pub events: Mutex<Vec<NewEvent>>,
    fail_writes: AtomicBool,
    next_click_id: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every sink write fail, to exercise `StorageError` paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn add_token(&self, token: ResolvedToken, target_url: &str) {
        self.targets
            .lock()
            .unwrap()
            .insert(token.target_id.clone(), target_url.to_string());
        self.tokens.lock().unwrap().push(token);
    }

    pub fn add_site(&self, site: ResolvedSite) {
        self.sites.lock().unwrap().push(site);
    }

    pub fn click_count(&self) -> usize {
        self.clicks.lock().unwrap().len()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenResolver for MemoryStore {
    async fn resolve_token(&self, short_code: &str) -> Result<Option<ResolvedToken>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.short_code == short_code)
            .cloned())
    }
}

#[async_trait]
impl SiteResolver for MemoryStore {
    async fn resolve_site(&self, site_key: &str) -> Result<Option<ResolvedSite>> {
        Ok(self
            .sites
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.site_key == site_key)
            .cloned())
    }
}

#[async_trait]
impl TargetResolver for MemoryStore {
    async fn target_url(&self, target_id: &str) -> Result<Option<String>> {
        Ok(self.targets.lock().unwrap().get(target_id).cloned())
    }
}

#[async_trait]
impl ClickSink for MemoryStore {
    async fn insert_click(&self, click: NewClick) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrackgateError::database_operation("sink down"));
        }
        let mut next = self.next_click_id.lock().unwrap();
        *next += 1;
        let id = format!("click-{}", *next);
        self.clicks.lock().unwrap().push(click);
        Ok(id)
    }
}

#[async_trait]
impl EventSink for MemoryStore {
    async fn insert_events(&self, events: Vec<NewEvent>) -> Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrackgateError::database_operation("sink down"));
        }
        let count = events.len();
        self.events.lock().unwrap().extend(events);
        Ok(count)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn create_token(&self, new: NewToken) -> Result<ResolvedToken> {
        let token = ResolvedToken {
            id: format!("tok-{}", self.tokens.lock().unwrap().len() + 1),
            short_code: trackgate::security::generate_short_code(),
            tracker_id: new.tracker_id,
            campaign_id: new.campaign_id,
            channel_id: new.channel_id,
            target_id: new.target_id,
            mode: new.mode,
        };
        self.tokens.lock().unwrap().push(token.clone());
        Ok(token)
    }

    async fn list_tokens(&self, tracker_id: Option<&str>) -> Result<Vec<ResolvedToken>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| tracker_id.is_none_or(|id| t.tracker_id == id))
            .cloned()
            .collect())
    }

    async fn delete_token(&self, id: &str) -> Result<bool> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.id != id);
        Ok(tokens.len() < before)
    }
}

/// One RSA key pair per test binary; generation is too slow to repeat
/// per case.
static KEYS: Lazy<Arc<ServiceKeys>> =
    Lazy::new(|| Arc::new(ServiceKeys::generate_ephemeral("k-test").unwrap()));

pub fn shared_keys() -> Arc<ServiceKeys> {
    KEYS.clone()
}

pub struct TestHarness {
    pub pipeline: Arc<TrackPipeline>,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryAdmissionCache>,
    pub keys: Arc<ServiceKeys>,
}

pub fn harness(config: &AppConfig) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryAdmissionCache::new());
    let keys = shared_keys();

    let pipeline = Arc::new(TrackPipeline::new(
        config,
        cache.clone(),
        keys.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(GeoIpProvider::disabled()),
    ));

    TestHarness {
        pipeline,
        store,
        cache,
        keys,
    }
}

pub fn sample_token() -> ResolvedToken {
    ResolvedToken {
        id: "tok-1".to_string(),
        short_code: "a1b2c3d4".to_string(),
        tracker_id: "trk-1".to_string(),
        campaign_id: Some("cmp-1".to_string()),
        channel_id: Some("ch-1".to_string()),
        target_id: "tgt-1".to_string(),
        mode: "302".to_string(),
    }
}

pub fn sample_site() -> ResolvedSite {
    ResolvedSite {
        id: "site-1".to_string(),
        site_key: "sk-1".to_string(),
        domain: "a.example".to_string(),
    }
}

/// A clean browser submission.
pub fn browser_client() -> ClientInfo {
    ClientInfo {
        ip: "203.0.113.9".to_string(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0".to_string(),
        accept_language: "en-US,en;q=0.9".to_string(),
        referer: "https://ads.example/campaign".to_string(),
        sec_fetch_mode: "cors".to_string(),
    }
}

/// Seal a payload exactly the way the SDK does, with explicit timestamp
/// and anti-replay nonce.
pub fn seal_params(keys: &ServiceKeys, payload: &Value, ts: i64, nonce2: &str) -> Value {
    let sealed = encrypt_envelope(keys.public_key(), payload.to_string().as_bytes()).unwrap();
    json!({
        "ek": BASE64.encode(&sealed.ek),
        "nonce": BASE64.encode(&sealed.nonce),
        "ct": BASE64.encode(&sealed.ct),
        "ts": ts,
        "nonce2": nonce2,
        "kid": keys.kid(),
    })
}

/// Fresh, valid params for a click submission of `visitor_id`.
pub fn click_params(keys: &ServiceKeys, short_code: &str, visitor_id: &str, nonce2: &str) -> Value {
    let payload = json!({
        "token": short_code,
        "visitor_id": visitor_id,
        "env": {"screen_width": 1920},
    });
    seal_params(keys, &payload, chrono::Utc::now().timestamp(), nonce2)
}
