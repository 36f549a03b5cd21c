//! End-to-end orchestrator behavior with in-memory collaborators.

mod common;

use serde_json::json;

use trackgate::config::{AppConfig, BotBlockMode};
use trackgate::rpc::ErrorCode;
use trackgate::rpc::track::RedirectRejection;

use common::{browser_client, click_params, harness, sample_site, sample_token, seal_params};

fn default_config() -> AppConfig {
    AppConfig::default()
}

#[tokio::test]
async fn accepted_click_persists_one_record() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    let params = click_params(&h.keys, "a1b2c3d4", "v-1", "nonce-accept-1");
    let result = h.pipeline.collect_click(&client, params).await.unwrap();

    assert_eq!(result["target_id"], json!("tgt-1"));
    assert!(result["click_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(result.get("dedup").is_none());

    let clicks = h.store.clicks.lock().unwrap();
    assert_eq!(clicks.len(), 1);
    let click = &clicks[0];
    assert_eq!(click.tracker_id, "trk-1");
    assert_eq!(click.campaign_id.as_deref(), Some("cmp-1"));
    assert_eq!(click.channel_id.as_deref(), Some("ch-1"));
    assert_eq!(click.visitor_id.as_deref(), Some("v-1"));
    assert_eq!(click.ip.as_deref(), Some("203.0.113.9"));
    assert!(!click.suspected_bot);
    assert!(!click.is_bot);
    assert_eq!(click.props.as_ref().unwrap()["screen_width"], json!(1920));
}

#[tokio::test]
async fn duplicate_click_acknowledged_but_not_persisted() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    let first = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-dup", "nonce-dup-1"))
        .await
        .unwrap();
    assert!(first.get("dedup").is_none());

    let second = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-dup", "nonce-dup-2"))
        .await
        .unwrap();
    assert_eq!(second["dedup"], json!(true));
    assert_eq!(second["click_id"], json!(""));

    assert_eq!(h.store.click_count(), 1);
}

#[tokio::test]
async fn replayed_nonce_is_rejected() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    h.pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-1", "nonce-replay"))
        .await
        .unwrap();

    // 相同 nonce2，不同 visitor，仍然拒绝
    let err = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-2", "nonce-replay"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ReplayDetected);
    assert_eq!(err.message, "replay_detected");
    assert_eq!(h.store.click_count(), 1);
}

#[tokio::test]
async fn stale_timestamp_is_rejected_before_decryption() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    let stale = chrono::Utc::now().timestamp() - 400;
    let payload = json!({"token": "a1b2c3d4", "visitor_id": "v-1"});
    let params = seal_params(&h.keys, &payload, stale, "nonce-stale");

    let err = h.pipeline.collect_click(&client, params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpiredTimestamp);

    // 未来方向同样适用
    let future = chrono::Utc::now().timestamp() + 400;
    let params = seal_params(&h.keys, &payload, future, "nonce-future");
    let err = h.pipeline.collect_click(&client, params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExpiredTimestamp);
}

#[tokio::test]
async fn exhausted_quota_rejects_before_everything_else() {
    let mut config = default_config();
    config.rate_limit.per_ip_per_minute = 0;
    let h = harness(&config);
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    let err = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-1", "nonce-rl"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimited);
    assert_eq!(h.store.click_count(), 0);
}

#[tokio::test]
async fn unresolvable_short_code_is_invalid_token() {
    let h = harness(&default_config());
    let client = browser_client();

    let err = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "zzzzzzzz", "v-1", "nonce-unknown"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidToken);
}

#[tokio::test]
async fn tampered_ciphertext_is_decrypt_failed() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    let client = browser_client();

    let mut params = click_params(&h.keys, "a1b2c3d4", "v-1", "nonce-tamper");
    params["ct"] = json!("AAAAaaaaAAAA");

    let err = h.pipeline.collect_click(&client, params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DecryptFailed);
}

#[tokio::test]
async fn blocked_bot_rejected_only_in_reject_mode() {
    let bot_client = {
        let mut client = browser_client();
        client.user_agent = "curl/8.4.0".to_string();
        client.accept_language = String::new();
        client.sec_fetch_mode = String::new();
        client
    };

    // flag 模式：接受并打标
    let mut config = default_config();
    config.bot.block_mode = BotBlockMode::Flag;
    let h = harness(&config);
    h.store.add_token(sample_token(), "https://dest.example/");
    h.pipeline
        .collect_click(&bot_client, click_params(&h.keys, "a1b2c3d4", "v-bot", "nonce-bot-flag"))
        .await
        .unwrap();
    {
        let clicks = h.store.clicks.lock().unwrap();
        assert!(clicks[0].suspected_bot);
        assert!(clicks[0].is_bot);
    }

    // reject 模式：拒绝且不落库
    let mut config = default_config();
    config.bot.block_mode = BotBlockMode::Reject;
    let h = harness(&config);
    h.store.add_token(sample_token(), "https://dest.example/");
    let err = h
        .pipeline
        .collect_click(&bot_client, click_params(&h.keys, "a1b2c3d4", "v-bot", "nonce-bot-reject"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BotBlocked);
    assert_eq!(h.store.click_count(), 0);
}

#[tokio::test]
async fn cache_outage_admits_traffic() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    h.cache.set_unavailable(true);
    let client = browser_client();

    // 限流、防重放、去重全部 fail-open，相同提交连发两次都成功落库
    for nonce in ["nonce-outage", "nonce-outage"] {
        h.pipeline
            .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-1", nonce))
            .await
            .unwrap();
    }
    assert_eq!(h.store.click_count(), 2);
}

#[tokio::test]
async fn sink_failure_surfaces_storage_error() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/");
    h.store.set_fail_writes(true);
    let client = browser_client();

    let err = h
        .pipeline
        .collect_click(&client, click_params(&h.keys, "a1b2c3d4", "v-1", "nonce-sink"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
}

#[tokio::test]
async fn event_batch_shares_one_timestamp() {
    let h = harness(&default_config());
    h.store.add_site(sample_site());
    let client = browser_client();

    let payload = json!({
        "site_key": "sk-1",
        "visitor_id": "v-1",
        "session_id": "s-1",
        "events": [
            {"type": "pageview", "url": "https://a.example/", "title": "Home", "referrer": ""},
            {"type": "click", "url": "https://a.example/p", "props": {"button": "buy"}},
            {"type": "pageview", "url": "https://a.example/q"},
        ],
    });
    let params = seal_params(&h.keys, &payload, chrono::Utc::now().timestamp(), "nonce-batch");

    let result = h.pipeline.collect_events(&client, params).await.unwrap();
    assert_eq!(result["ok"], json!(true));
    assert!(result["server_time"].as_i64().is_some());

    let events = h.store.events.lock().unwrap();
    assert_eq!(events.len(), 3);
    let ts = events[0].ts;
    assert!(events.iter().all(|e| e.ts == ts));
    assert!(events.iter().all(|e| e.site_id == "site-1"));
    assert!(events.iter().all(|e| e.visitor_id.as_deref() == Some("v-1")));
    assert_eq!(events[1].event_type, "click");
    assert_eq!(events[1].props.as_ref().unwrap()["button"], json!("buy"));
}

#[tokio::test]
async fn unknown_site_key_is_invalid_params() {
    let h = harness(&default_config());
    let client = browser_client();

    let payload = json!({
        "site_key": "nope",
        "visitor_id": "v-1",
        "session_id": "s-1",
        "events": [{"type": "pageview"}],
    });
    let params = seal_params(&h.keys, &payload, chrono::Utc::now().timestamp(), "nonce-badsite");

    let err = h.pipeline.collect_events(&client, params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParams);
    assert_eq!(err.data, Some(json!("invalid site_key")));
}

#[tokio::test]
async fn failed_batch_persists_nothing() {
    let h = harness(&default_config());
    h.store.add_site(sample_site());
    h.store.set_fail_writes(true);
    let client = browser_client();

    let payload = json!({
        "site_key": "sk-1",
        "visitor_id": "v-1",
        "session_id": "s-1",
        "events": [{"type": "pageview"}, {"type": "click"}],
    });
    let params = seal_params(&h.keys, &payload, chrono::Utc::now().timestamp(), "nonce-batch-fail");

    let err = h.pipeline.collect_events(&client, params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
    assert_eq!(h.store.event_count(), 0);
}

#[tokio::test]
async fn redirect_records_click_and_returns_target() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/landing");
    let client = browser_client();

    let target = h.pipeline.track_redirect(&client, "a1b2c3d4").await.unwrap();
    assert_eq!(target, "https://dest.example/landing");
    assert_eq!(h.store.click_count(), 1);
}

#[tokio::test]
async fn redirect_never_blocks_bots() {
    let mut config = default_config();
    config.bot.block_mode = BotBlockMode::Reject;
    let h = harness(&config);
    h.store.add_token(sample_token(), "https://dest.example/landing");

    let mut bot_client = browser_client();
    bot_client.user_agent = "HeadlessChrome puppeteer".to_string();
    bot_client.accept_language = String::new();
    bot_client.sec_fetch_mode = String::new();

    // reject 模式下 302 路径依然放行，只做被动标记
    let target = h
        .pipeline
        .track_redirect(&bot_client, "a1b2c3d4")
        .await
        .unwrap();
    assert_eq!(target, "https://dest.example/landing");

    let clicks = h.store.clicks.lock().unwrap();
    assert_eq!(clicks.len(), 1);
    assert!(clicks[0].suspected_bot);
}

#[tokio::test]
async fn redirect_survives_sink_failure() {
    let h = harness(&default_config());
    h.store.add_token(sample_token(), "https://dest.example/landing");
    h.store.set_fail_writes(true);
    let client = browser_client();

    // 落库失败只记日志，跳转照常
    let target = h.pipeline.track_redirect(&client, "a1b2c3d4").await.unwrap();
    assert_eq!(target, "https://dest.example/landing");
}

#[tokio::test]
async fn redirect_unknown_code_is_rejected() {
    let h = harness(&default_config());
    let client = browser_client();

    assert_eq!(
        h.pipeline.track_redirect(&client, "missing1").await,
        Err(RedirectRejection::UnknownToken)
    );
    assert_eq!(h.store.click_count(), 0);
}
