//! Wire envelope and error taxonomy
//!
//! Stable numeric codes with machine-readable snake_case messages; the
//! message is fixed per code, free-form detail only ever travels in
//! `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

/// 按域划分的错误码：
/// - 4000-4999: 准入拒绝
/// - 5000-5999: 服务端故障
/// - 负数: JSON-RPC 2.0 框架错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 准入拒绝 4000-4999
    InvalidToken = 4001,
    ExpiredTimestamp = 4002,
    RateLimited = 4003,
    ReplayDetected = 4004,
    DecryptFailed = 4005,
    BotBlocked = 4006,

    // 服务端故障 5000-5999
    StorageError = 5001,

    // JSON-RPC 2.0 框架错误
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    ParseError = -32700,
}

impl ErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::InvalidToken => "invalid_token",
            ErrorCode::ExpiredTimestamp => "expired_timestamp",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::ReplayDetected => "replay_detected",
            ErrorCode::DecryptFailed => "decrypt_failed",
            ErrorCode::BotBlocked => "bot_blocked",
            ErrorCode::StorageError => "storage_error",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::MethodNotFound => "method_not_found",
            ErrorCode::InvalidParams => "invalid_params",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, data: Value) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Caller-supplied correlation id, echoed back verbatim
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn err(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Encrypted submission parameters, exactly as the browser SDK sends
/// them (all byte fields base64).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedParams {
    /// RSA-OAEP wrapped AES key
    pub ek: String,
    /// AES-GCM nonce
    pub nonce: String,
    /// Ciphertext
    pub ct: String,
    /// Claimed unix timestamp (seconds)
    pub ts: i64,
    /// Single-use anti-replay nonce
    pub nonce2: String,
    /// Informational key id
    #[serde(default)]
    pub kid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_codes_serialize_as_numbers() {
        let err = RpcError::new(ErrorCode::ReplayDetected);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, json!({"code": 4004, "message": "replay_detected"}));

        let parse = RpcError::new(ErrorCode::ParseError);
        assert_eq!(serde_json::to_value(&parse).unwrap()["code"], json!(-32700));
    }

    #[test]
    fn response_omits_absent_half() {
        let ok = RpcResponse::ok(json!(1), json!({"ok": true}));
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["id"], json!(1));

        let err = RpcResponse::err(json!("abc"), RpcError::new(ErrorCode::RateLimited));
        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], json!(4003));
        assert_eq!(value["id"], json!("abc"));
    }
}
