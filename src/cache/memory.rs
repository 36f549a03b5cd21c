//! In-memory admission cache for tests and single-node development.
//!
//! Uses `tokio::time::Instant` so expiry cooperates with paused-clock
//! tests. The `fail` switch simulates a cache outage to exercise the
//! guards' fail-open branches.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{AdmissionCache, CounterOutcome, CreateOutcome};

struct Entry {
    value: i64,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryAdmissionCache {
    entries: Mutex<HashMap<String, Entry>>,
    fail: AtomicBool,
}

impl MemoryAdmissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a cache outage: every operation reports `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail.store(unavailable, Ordering::SeqCst);
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
        entries.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait]
impl AdmissionCache for MemoryAdmissionCache {
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> CreateOutcome {
        if self.fail.load(Ordering::SeqCst) {
            return CreateOutcome::Unavailable;
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        Self::purge_expired(&mut entries, now);

        if entries.contains_key(key) {
            return CreateOutcome::Exists;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: 1,
                expires_at: now + ttl,
            },
        );
        CreateOutcome::Created
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> CounterOutcome {
        if self.fail.load(Ordering::SeqCst) {
            return CounterOutcome::Unavailable;
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        Self::purge_expired(&mut entries, now);

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: 0,
            // 首次写入设置过期时间，后续递增不再延长
            expires_at: now + ttl,
        });
        entry.value += 1;
        CounterOutcome::Counted(entry.value)
    }
}
