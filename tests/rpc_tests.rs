//! Transport framing and method dispatch over HTTP.

mod common;

use std::sync::Arc;

use actix_web::{App, test, web};
use serde_json::{Value, json};

use trackgate::config::AppConfig;
use trackgate::rpc::{Dispatcher, TokenAdminService, handle_rpc};

use common::{MemoryStore, click_params, harness, sample_token};

struct RpcApp {
    dispatcher: Arc<Dispatcher>,
    config: Arc<AppConfig>,
    harness: common::TestHarness,
    store: Arc<MemoryStore>,
}

fn rpc_app(config: AppConfig) -> RpcApp {
    let h = harness(&config);
    let store = h.store.clone();
    let admin = Arc::new(TokenAdminService::new(store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(h.pipeline.clone(), admin));
    RpcApp {
        dispatcher,
        config: Arc::new(config),
        harness: h,
        store,
    }
}

macro_rules! init_service {
    ($app:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($app.dispatcher.clone()))
                .app_data(web::Data::new($app.config.clone()))
                .route("/rpc", web::post().to(handle_rpc)),
        )
        .await
    };
}

macro_rules! post_rpc {
    ($service:expr, $body:expr $(,)?) => {{
        let req = test::TestRequest::post()
            .uri("/rpc")
            .insert_header(("Content-Type", "application/json"))
            .set_payload($body.to_string())
            .to_request();
        let response: Value = test::call_and_read_body_json($service, req).await;
        response
    }};
}

#[actix_rt::test]
async fn malformed_body_is_parse_error() {
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    let req = test::TestRequest::post()
        .uri("/rpc")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let response: Value = test::call_and_read_body_json(&service, req).await;

    assert_eq!(response["error"]["code"], json!(-32700));
    assert_eq!(response["error"]["message"], json!("parse_error"));
    assert_eq!(response["id"], Value::Null);
}

#[actix_rt::test]
async fn wrong_protocol_version_is_invalid_request() {
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    let response = post_rpc!(
        &service,
        json!({"jsonrpc": "1.0", "method": "track.collectClick", "id": 7}),
    );

    assert_eq!(response["error"]["code"], json!(-32600));
    assert_eq!(response["id"], json!(7));
}

#[actix_rt::test]
async fn unknown_method_is_method_not_found() {
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    let response = post_rpc!(
        &service,
        json!({"jsonrpc": "2.0", "method": "track.nope", "id": "corr-1"}),
    );

    assert_eq!(response["error"]["code"], json!(-32601));
    assert_eq!(response["error"]["data"], json!("track.nope"));
    // correlation id 原样回显
    assert_eq!(response["id"], json!("corr-1"));
}

#[actix_rt::test]
async fn click_submission_over_http() {
    let app = rpc_app(AppConfig::default());
    app.store.add_token(sample_token(), "https://dest.example/");
    let service = init_service!(app);

    let params = click_params(&app.harness.keys, "a1b2c3d4", "v-http", "nonce-http-1");
    let response = post_rpc!(
        &service,
        json!({"jsonrpc": "2.0", "method": "track.collectClick", "params": params, "id": 42}),
    );

    assert!(response.get("error").is_none(), "unexpected: {response}");
    assert_eq!(response["result"]["target_id"], json!("tgt-1"));
    assert_eq!(response["id"], json!(42));
    assert_eq!(app.store.click_count(), 1);
}

#[actix_rt::test]
async fn admission_error_keeps_http_200_envelope() {
    let mut config = AppConfig::default();
    config.rate_limit.per_ip_per_minute = 0;
    let app = rpc_app(config);
    app.store.add_token(sample_token(), "https://dest.example/");
    let service = init_service!(app);

    let params = click_params(&app.harness.keys, "a1b2c3d4", "v-http", "nonce-http-2");
    let req = test::TestRequest::post()
        .uri("/rpc")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(
            json!({"jsonrpc": "2.0", "method": "track.collectClick", "params": params, "id": 1})
                .to_string(),
        )
        .to_request();
    let response = test::call_service(&service, req).await;

    // 错误在 envelope 里，不在 HTTP 状态码上
    assert_eq!(response.status(), actix_web::http::StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["code"], json!(4003));
    assert_eq!(body["error"]["message"], json!("rate_limited"));
}

#[actix_rt::test]
async fn token_admin_lifecycle() {
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    let created = post_rpc!(
        &service,
        json!({
            "jsonrpc": "2.0",
            "method": "token.create",
            "params": {"tracker_id": "trk-9", "target_id": "tgt-9", "mode": "js"},
            "id": 1,
        }),
    );
    let short_code = created["result"]["short_code"].as_str().unwrap().to_string();
    assert_eq!(short_code.len(), 8);
    let token_id = created["result"]["id"].as_str().unwrap().to_string();

    let listed = post_rpc!(
        &service,
        json!({"jsonrpc": "2.0", "method": "token.list", "params": {"tracker_id": "trk-9"}, "id": 2}),
    );
    assert_eq!(listed["result"].as_array().unwrap().len(), 1);

    let deleted = post_rpc!(
        &service,
        json!({"jsonrpc": "2.0", "method": "token.delete", "params": {"id": token_id}, "id": 3}),
    );
    assert_eq!(deleted["result"]["deleted"], json!(true));

    let relisted = post_rpc!(
        &service,
        json!({"jsonrpc": "2.0", "method": "token.list", "params": {}, "id": 4}),
    );
    assert_eq!(relisted["result"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn invalid_mode_rejected_on_create() {
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    let response = post_rpc!(
        &service,
        json!({
            "jsonrpc": "2.0",
            "method": "token.create",
            "params": {"tracker_id": "trk-9", "target_id": "tgt-9", "mode": "banner"},
            "id": 1,
        }),
    );
    assert_eq!(response["error"]["code"], json!(-32602));
}

#[actix_rt::test]
async fn method_names_match_exactly() {
    // 方法表在 dispatcher 构造时建好；大小写或前缀不符一律 MethodNotFound
    let app = rpc_app(AppConfig::default());
    let service = init_service!(app);

    for method in ["collectClick", "track.collectclick", "TRACK.COLLECTCLICK", ""] {
        let response = post_rpc!(
            &service,
            json!({"jsonrpc": "2.0", "method": method, "id": 1}),
        );
        assert_eq!(response["error"]["code"], json!(-32601), "method {method}");
    }
}
