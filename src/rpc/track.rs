//! Ingestion orchestrator
//!
//! Composes the admission guards, the envelope decryptor and the
//! persistence collaborators into the two ingestion pipelines, in a
//! fixed order: rate limit → replay → decrypt → parse → resolve →
//! bot score → (click only) dedup → persist. Any stage short-circuits
//! with its taxonomy error; no stage is retried.
//!
//! The redirect-mode path (`track_redirect`) shares the resolver, bot
//! scorer and click sink but deliberately skips the hard checks: the
//! end user's navigation must always complete.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};

use crate::admission::{BotDetector, ClientInfo, DedupGuard, RateLimiter, ReplayGuard};
use crate::admission::replay::ReplayRejection;
use crate::cache::AdmissionCache;
use crate::config::{AppConfig, BotBlockMode};
use crate::rpc::protocol::{EncryptedParams, ErrorCode, RpcError};
use crate::security::{ServiceKeys, decrypt_envelope};
use crate::services::geoip::GeoIpProvider;
use crate::storage::{
    ClickSink, EventSink, NewClick, NewEvent, ResolvedToken, SiteResolver, TargetResolver,
    TokenResolver,
};

/// Failures of the redirect-mode path. The HTTP layer maps these onto
/// plain status codes; they never reach the RPC error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectRejection {
    UnknownToken,
    MissingTarget,
}

pub struct TrackPipeline {
    limiter: RateLimiter,
    replay: ReplayGuard,
    bots: BotDetector,
    dedup: DedupGuard,
    bot_mode: BotBlockMode,
    keys: Arc<ServiceKeys>,
    tokens: Arc<dyn TokenResolver>,
    sites: Arc<dyn SiteResolver>,
    targets: Arc<dyn TargetResolver>,
    clicks: Arc<dyn ClickSink>,
    events: Arc<dyn EventSink>,
    geo: Arc<GeoIpProvider>,
}

/// Decrypted click submission
#[derive(Debug, Deserialize)]
struct ClickPayload {
    token: String,
    #[serde(default)]
    visitor_id: String,
    #[serde(default)]
    env: Option<Value>,
}

/// Decrypted event batch submission
#[derive(Debug, Deserialize)]
struct EventsPayload {
    site_key: String,
    #[serde(default)]
    visitor_id: String,
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    events: Vec<EventPayload>,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    referrer: String,
    #[serde(default)]
    props: Option<Value>,
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl TrackPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        cache: Arc<dyn AdmissionCache>,
        keys: Arc<ServiceKeys>,
        tokens: Arc<dyn TokenResolver>,
        sites: Arc<dyn SiteResolver>,
        targets: Arc<dyn TargetResolver>,
        clicks: Arc<dyn ClickSink>,
        events: Arc<dyn EventSink>,
        geo: Arc<GeoIpProvider>,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(cache.clone(), &config.rate_limit),
            replay: ReplayGuard::new(cache.clone(), &config.security),
            bots: BotDetector::new(cache.clone(), &config.bot),
            dedup: DedupGuard::new(cache, &config.security),
            bot_mode: config.bot.block_mode,
            keys,
            tokens,
            sites,
            targets,
            clicks,
            events,
            geo,
        }
    }

    /// `track.collectClick` — single encrypted click submission.
    #[instrument(skip(self, client, params), fields(ip = %client.ip))]
    pub async fn collect_click(
        &self,
        client: &ClientInfo,
        params: Value,
    ) -> Result<Value, RpcError> {
        let envelope: EncryptedParams = serde_json::from_value(params)
            .map_err(|e| RpcError::with_data(ErrorCode::InvalidParams, json!(e.to_string())))?;

        let plaintext = self.admit_and_open(client, &envelope).await?;

        let payload: ClickPayload = serde_json::from_slice(&plaintext).map_err(|_| {
            RpcError::with_data(ErrorCode::InvalidParams, json!("invalid decrypted payload"))
        })?;

        let token = match self.tokens.resolve_token(&payload.token).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RpcError::new(ErrorCode::InvalidToken)),
            Err(e) => {
                error!("Token resolution failed: {}", e);
                return Err(RpcError::new(ErrorCode::StorageError));
            }
        };

        let verdict = self.bots.assess(client, &client.referer).await;
        if verdict.blocked && self.bot_mode == BotBlockMode::Reject {
            debug!("Rejecting click, bot score {}", verdict.score);
            return Err(RpcError::new(ErrorCode::BotBlocked));
        }

        // 重复点击：向客户端确认成功，但不再落库
        if self
            .dedup
            .is_duplicate(
                &token.tracker_id,
                token.channel_id.as_deref(),
                &payload.visitor_id,
            )
            .await
        {
            debug!("Duplicate click suppressed for token {}", token.short_code);
            return Ok(json!({
                "click_id": "",
                "target_id": token.target_id,
                "dedup": true,
            }));
        }

        let click = self
            .build_click(client, &token, non_empty(&payload.visitor_id), payload.env, verdict.suspected, verdict.blocked)
            .await;

        let click_id = self.clicks.insert_click(click).await.map_err(|e| {
            error!("Failed to persist click: {}", e);
            RpcError::new(ErrorCode::StorageError)
        })?;

        Ok(json!({
            "click_id": click_id,
            "target_id": token.target_id,
        }))
    }

    /// `track.collectEvents` — encrypted behavioral event batch.
    #[instrument(skip(self, client, params), fields(ip = %client.ip))]
    pub async fn collect_events(
        &self,
        client: &ClientInfo,
        params: Value,
    ) -> Result<Value, RpcError> {
        let envelope: EncryptedParams = serde_json::from_value(params)
            .map_err(|e| RpcError::with_data(ErrorCode::InvalidParams, json!(e.to_string())))?;

        let plaintext = self.admit_and_open(client, &envelope).await?;

        let payload: EventsPayload = serde_json::from_slice(&plaintext).map_err(|_| {
            RpcError::with_data(ErrorCode::InvalidParams, json!("invalid decrypted payload"))
        })?;

        let site = match self.sites.resolve_site(&payload.site_key).await {
            Ok(Some(site)) => site,
            Ok(None) => {
                return Err(RpcError::with_data(
                    ErrorCode::InvalidParams,
                    json!("invalid site_key"),
                ));
            }
            Err(e) => {
                error!("Site resolution failed: {}", e);
                return Err(RpcError::new(ErrorCode::StorageError));
            }
        };

        // 整批共用一次判定（信号相同）
        let verdict = self.bots.assess(client, "").await;
        if verdict.blocked && self.bot_mode == BotBlockMode::Reject {
            debug!("Rejecting event batch, bot score {}", verdict.score);
            return Err(RpcError::new(ErrorCode::BotBlocked));
        }

        let country = self.geo.country(&client.ip).await;
        let now = Utc::now();
        let events: Vec<NewEvent> = payload
            .events
            .into_iter()
            .map(|event| NewEvent {
                // 整批共享同一个落库时间戳
                ts: now,
                site_id: site.id.clone(),
                event_type: event.event_type,
                visitor_id: non_empty(&payload.visitor_id),
                session_id: non_empty(&payload.session_id),
                url: non_empty(&event.url),
                title: non_empty(&event.title),
                referrer: non_empty(&event.referrer),
                ip: non_empty(&client.ip),
                country: country.clone(),
                ua: non_empty(&client.user_agent),
                lang: non_empty(&client.accept_language),
                props: event.props,
                suspected_bot: verdict.suspected,
                is_bot: verdict.blocked,
            })
            .collect();

        self.events.insert_events(events).await.map_err(|e| {
            error!("Failed to persist event batch: {}", e);
            RpcError::new(ErrorCode::StorageError)
        })?;

        Ok(json!({
            "ok": true,
            "server_time": now.timestamp(),
        }))
    }

    /// Redirect-mode tracking: resolve, passively score, record, and
    /// hand back the destination. The click record is best-effort; a
    /// sink failure is logged and the redirect still happens.
    #[instrument(skip(self, client), fields(ip = %client.ip, code = %short_code))]
    pub async fn track_redirect(
        &self,
        client: &ClientInfo,
        short_code: &str,
    ) -> Result<String, RedirectRejection> {
        let (token, target_url) = self.resolve_token_target(short_code).await?;

        // 302 路径只做被动标记，永远不拦截跳转
        let verdict = self.bots.assess(client, &client.referer).await;

        let click = self
            .build_click(client, &token, None, None, verdict.suspected, verdict.blocked)
            .await;
        if let Err(e) = self.clicks.insert_click(click).await {
            error!("Failed to record click for token {}: {}", short_code, e);
        }

        Ok(target_url)
    }

    /// Resolve a short code and its destination URL, without recording
    /// anything. Used by the script-mode interstitial.
    pub async fn resolve_token_target(
        &self,
        short_code: &str,
    ) -> Result<(ResolvedToken, String), RedirectRejection> {
        let token = match self.tokens.resolve_token(short_code).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(RedirectRejection::UnknownToken),
            Err(e) => {
                error!("Token resolution failed: {}", e);
                return Err(RedirectRejection::UnknownToken);
            }
        };

        let target_url = match self.targets.target_url(&token.target_id).await {
            Ok(Some(url)) => url,
            Ok(None) => return Err(RedirectRejection::MissingTarget),
            Err(e) => {
                error!("Target resolution failed: {}", e);
                return Err(RedirectRejection::MissingTarget);
            }
        };

        Ok((token, target_url))
    }

    /// The shared front of both RPC pipelines: cheap checks before the
    /// expensive decryption, then open the envelope.
    async fn admit_and_open(
        &self,
        client: &ClientInfo,
        envelope: &EncryptedParams,
    ) -> Result<Vec<u8>, RpcError> {
        if self
            .limiter
            .check(&client.ip, &client.user_agent, None)
            .await
            .is_err()
        {
            return Err(RpcError::new(ErrorCode::RateLimited));
        }

        match self.replay.check(envelope.ts, &envelope.nonce2).await {
            Ok(()) => {}
            Err(ReplayRejection::ExpiredTimestamp) => {
                return Err(RpcError::new(ErrorCode::ExpiredTimestamp));
            }
            Err(ReplayRejection::ReplayDetected) => {
                warn!("Replayed nonce from {}", client.ip);
                return Err(RpcError::new(ErrorCode::ReplayDetected));
            }
        }

        // 编码错误与解密错误一律折叠成同一个 DecryptFailed
        let ek = BASE64
            .decode(&envelope.ek)
            .map_err(|_| RpcError::new(ErrorCode::DecryptFailed))?;
        let nonce = BASE64
            .decode(&envelope.nonce)
            .map_err(|_| RpcError::new(ErrorCode::DecryptFailed))?;
        let ct = BASE64
            .decode(&envelope.ct)
            .map_err(|_| RpcError::new(ErrorCode::DecryptFailed))?;

        decrypt_envelope(self.keys.private_key(), &ek, &nonce, &ct)
            .map_err(|_| RpcError::new(ErrorCode::DecryptFailed))
    }

    async fn build_click(
        &self,
        client: &ClientInfo,
        token: &ResolvedToken,
        visitor_id: Option<String>,
        props: Option<Value>,
        suspected_bot: bool,
        is_bot: bool,
    ) -> NewClick {
        NewClick {
            ts: Utc::now(),
            tracker_id: token.tracker_id.clone(),
            campaign_id: token.campaign_id.clone(),
            channel_id: token.channel_id.clone(),
            target_id: Some(token.target_id.clone()),
            visitor_id,
            ip: non_empty(&client.ip),
            country: self.geo.country(&client.ip).await,
            ua: non_empty(&client.user_agent),
            lang: non_empty(&client.accept_language),
            referer: non_empty(&client.referer),
            props,
            suspected_bot,
            is_bot,
        }
    }
}
