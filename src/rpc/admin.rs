//! Administrative token methods
//!
//! Thin CRUD over the token store. Tokens are immutable once minted;
//! the only mutation is deletion, which revokes the short code without
//! touching telemetry already recorded under it.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::rpc::protocol::{ErrorCode, RpcError};
use crate::storage::{NewToken, ResolvedToken, TokenStore};

pub struct TokenAdminService {
    store: Arc<dyn TokenStore>,
}

#[derive(Debug, Deserialize)]
struct CreateTokenParams {
    tracker_id: String,
    #[serde(default)]
    campaign_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    target_id: String,
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "302".to_string()
}

#[derive(Debug, Deserialize)]
struct ListTokenParams {
    #[serde(default)]
    tracker_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteTokenParams {
    id: String,
}

fn token_json(token: &ResolvedToken) -> Value {
    json!({
        "id": token.id,
        "short_code": token.short_code,
        "tracker_id": token.tracker_id,
        "campaign_id": token.campaign_id,
        "channel_id": token.channel_id,
        "target_id": token.target_id,
        "mode": token.mode,
    })
}

impl TokenAdminService {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// `token.create`
    pub async fn create(&self, params: Value) -> Result<Value, RpcError> {
        let params: CreateTokenParams = serde_json::from_value(params)
            .map_err(|e| RpcError::with_data(ErrorCode::InvalidParams, json!(e.to_string())))?;

        if params.mode != "js" && params.mode != "302" {
            return Err(RpcError::with_data(
                ErrorCode::InvalidParams,
                json!("mode must be \"js\" or \"302\""),
            ));
        }

        let token = self
            .store
            .create_token(NewToken {
                tracker_id: params.tracker_id,
                campaign_id: params.campaign_id,
                channel_id: params.channel_id,
                target_id: params.target_id,
                mode: params.mode,
            })
            .await
            .map_err(|e| {
                error!("Token creation failed: {}", e);
                RpcError::new(ErrorCode::StorageError)
            })?;

        Ok(token_json(&token))
    }

    /// `token.list`
    pub async fn list(&self, params: Value) -> Result<Value, RpcError> {
        let params: ListTokenParams = serde_json::from_value(params)
            .map_err(|e| RpcError::with_data(ErrorCode::InvalidParams, json!(e.to_string())))?;

        let tokens = self
            .store
            .list_tokens(params.tracker_id.as_deref())
            .await
            .map_err(|e| {
                error!("Token listing failed: {}", e);
                RpcError::new(ErrorCode::StorageError)
            })?;

        Ok(Value::Array(tokens.iter().map(token_json).collect()))
    }

    /// `token.delete`
    pub async fn delete(&self, params: Value) -> Result<Value, RpcError> {
        let params: DeleteTokenParams = serde_json::from_value(params)
            .map_err(|e| RpcError::with_data(ErrorCode::InvalidParams, json!(e.to_string())))?;

        let deleted = self.store.delete_token(&params.id).await.map_err(|e| {
            error!("Token deletion failed: {}", e);
            RpcError::new(ErrorCode::StorageError)
        })?;

        Ok(json!({"deleted": deleted}))
    }
}
