//! RPC method dispatch
//!
//! A static table from method name to a tagged handler variant, built
//! once at startup. The dispatcher frames requests and responses; it
//! performs no admission logic of its own.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::{Value, json};

use super::admin::TokenAdminService;
use super::protocol::{ErrorCode, RpcError, RpcRequest, RpcResponse};
use super::track::TrackPipeline;
use crate::admission::ClientInfo;
use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpcMethod {
    CollectClick,
    CollectEvents,
    TokenCreate,
    TokenList,
    TokenDelete,
}

pub struct Dispatcher {
    methods: HashMap<&'static str, RpcMethod>,
    track: Arc<TrackPipeline>,
    admin: Arc<TokenAdminService>,
}

impl Dispatcher {
    pub fn new(track: Arc<TrackPipeline>, admin: Arc<TokenAdminService>) -> Self {
        let mut methods = HashMap::new();
        methods.insert("track.collectClick", RpcMethod::CollectClick);
        methods.insert("track.collectEvents", RpcMethod::CollectEvents);
        methods.insert("token.create", RpcMethod::TokenCreate);
        methods.insert("token.list", RpcMethod::TokenList);
        methods.insert("token.delete", RpcMethod::TokenDelete);
        Self {
            methods,
            track,
            admin,
        }
    }

    pub async fn dispatch(&self, client: &ClientInfo, request: RpcRequest) -> RpcResponse {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return RpcResponse::err(
                id,
                RpcError::with_data(ErrorCode::InvalidRequest, json!("jsonrpc must be 2.0")),
            );
        }

        let Some(method) = self.methods.get(request.method.as_str()) else {
            return RpcResponse::err(
                id,
                RpcError::with_data(ErrorCode::MethodNotFound, json!(request.method)),
            );
        };

        let result = match method {
            RpcMethod::CollectClick => self.track.collect_click(client, request.params).await,
            RpcMethod::CollectEvents => self.track.collect_events(client, request.params).await,
            RpcMethod::TokenCreate => self.admin.create(request.params).await,
            RpcMethod::TokenList => self.admin.list(request.params).await,
            RpcMethod::TokenDelete => self.admin.delete(request.params).await,
        };

        match result {
            Ok(value) => RpcResponse::ok(id, value),
            Err(error) => RpcResponse::err(id, error),
        }
    }
}

/// POST /rpc
///
/// Transport framing only: body parse errors surface as JSON-RPC
/// `ParseError`; everything else is the dispatcher's verdict. Always
/// HTTP 200, the envelope carries the outcome.
pub async fn handle_rpc(
    req: HttpRequest,
    body: web::Bytes,
    dispatcher: web::Data<Arc<Dispatcher>>,
    config: web::Data<Arc<AppConfig>>,
) -> HttpResponse {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return HttpResponse::Ok().json(RpcResponse::err(
                Value::Null,
                RpcError::with_data(ErrorCode::ParseError, json!(e.to_string())),
            ));
        }
    };

    let client = ClientInfo::from_request(&req, &config.service.trusted_proxies);
    HttpResponse::Ok().json(dispatcher.dispatch(&client, request).await)
}
