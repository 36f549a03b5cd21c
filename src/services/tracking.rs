//! Public tracking endpoints
//!
//! The user-facing HTTP surface: redirect-mode and script-mode tracking
//! links, the browser SDK, and public key distribution. Admission logic
//! stays in the pipeline; these handlers only translate outcomes into
//! HTTP.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use tracing::instrument;

use crate::admission::ClientInfo;
use crate::config::AppConfig;
use crate::rpc::TrackPipeline;
use crate::rpc::track::RedirectRejection;
use crate::security::ServiceKeys;
use crate::services::sdk;

pub struct TrackingService {}

impl TrackingService {
    /// GET /r/{code} — redirect-mode tracking.
    ///
    /// The navigation always completes with a redirect when the code
    /// resolves; bot suspicion only flags the stored record.
    #[instrument(skip(req, pipeline, config), fields(code = %path))]
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        pipeline: web::Data<Arc<TrackPipeline>>,
        config: web::Data<Arc<AppConfig>>,
    ) -> impl Responder {
        let short_code = path.into_inner();
        let client = ClientInfo::from_request(&req, &config.service.trusted_proxies);

        match pipeline.track_redirect(&client, &short_code).await {
            Ok(target_url) => HttpResponse::Found()
                .insert_header(("Location", target_url))
                .finish(),
            Err(rejection) => Self::rejection_response(rejection),
        }
    }

    /// GET /t/{code} — script-mode tracking.
    ///
    /// Serves an interstitial that performs the encrypted submission
    /// client-side before navigating; the click is recorded by the RPC
    /// pipeline, not here.
    pub async fn handle_script_page(
        path: web::Path<String>,
        pipeline: web::Data<Arc<TrackPipeline>>,
        keys: web::Data<Arc<ServiceKeys>>,
        config: web::Data<Arc<AppConfig>>,
    ) -> impl Responder {
        let short_code = path.into_inner();

        let (_, target_url) = match pipeline.resolve_token_target(&short_code).await {
            Ok(resolved) => resolved,
            Err(rejection) => return Self::rejection_response(rejection),
        };

        let public_key_pem = match keys.public_key_pem() {
            Ok(pem) => pem,
            Err(_) => return HttpResponse::InternalServerError().body("server error"),
        };

        let html = sdk::generate_click_page(
            &short_code,
            &public_key_pem,
            keys.kid(),
            &config.service.export_url,
            &target_url,
        );
        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body(html)
    }

    /// GET /sdk/track.js — browser SDK.
    pub async fn handle_sdk(
        keys: web::Data<Arc<ServiceKeys>>,
        config: web::Data<Arc<AppConfig>>,
    ) -> impl Responder {
        let public_key_pem = match keys.public_key_pem() {
            Ok(pem) => pem,
            Err(_) => return HttpResponse::InternalServerError().body("server error"),
        };

        let js = sdk::generate_sdk(&public_key_pem, keys.kid(), &config.service.export_url);
        HttpResponse::Ok()
            .insert_header(("Content-Type", "application/javascript; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=3600"))
            .body(js)
    }

    /// GET /api/public-keys — key distribution for custom clients.
    pub async fn handle_public_keys(keys: web::Data<Arc<ServiceKeys>>) -> impl Responder {
        match keys.public_key_pem() {
            Ok(pem) => HttpResponse::Ok().json(json!({
                "kid": keys.kid(),
                "public_key": pem,
            })),
            Err(_) => HttpResponse::InternalServerError().json(json!({"error": "server error"})),
        }
    }

    fn rejection_response(rejection: RedirectRejection) -> HttpResponse {
        match rejection {
            RedirectRejection::UnknownToken => HttpResponse::build(StatusCode::BAD_REQUEST)
                .insert_header(("Content-Type", "text/html; charset=utf-8"))
                .body("invalid token"),
            RedirectRejection::MissingTarget => HttpResponse::build(StatusCode::NOT_FOUND)
                .insert_header(("Content-Type", "text/html; charset=utf-8"))
                .body("target not found"),
        }
    }
}
