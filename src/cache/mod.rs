//! Shared admission cache
//!
//! All cross-request admission state (nonce markers, rate counters,
//! dedup markers) lives behind [`AdmissionCache`]. The trait exposes
//! exactly the two atomic primitives the guards rely on, and every
//! operation reports a tri-state outcome so each guard can apply its
//! own fail-open policy as an explicit branch instead of swallowing
//! errors.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryAdmissionCache;
pub use redis::RedisAdmissionCache;

/// Outcome of a create-if-absent operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Key did not exist; it was created with the requested TTL
    Created,
    /// Key already existed; nothing was written
    Exists,
    /// Cache error or timeout; the caller decides what that means
    Unavailable,
}

/// Outcome of an atomic increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    /// Post-increment counter value
    Counted(i64),
    /// Cache error or timeout
    Unavailable,
}

#[async_trait]
pub trait AdmissionCache: Send + Sync {
    /// Atomically create `key` with the given TTL if it does not exist
    /// (Redis `SET NX EX`).
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> CreateOutcome;

    /// Atomically increment `key`, attaching `ttl` when this increment
    /// created the key (first writer sets expiry, so buckets are
    /// self-expiring).
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> CounterOutcome;
}
