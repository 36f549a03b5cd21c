//! Method-dispatch transport and the ingestion orchestrator.
//!
//! The transport carries framing only: a JSON-RPC 2.0 shaped envelope
//! and a static method table. Every admission decision lives in
//! [`track::TrackPipeline`].

pub mod admin;
pub mod dispatcher;
pub mod protocol;
pub mod track;

pub use admin::TokenAdminService;
pub use dispatcher::{Dispatcher, handle_rpc};
pub use protocol::{EncryptedParams, ErrorCode, RpcError, RpcRequest, RpcResponse};
pub use track::TrackPipeline;
