//! Redis 实现的共享准入缓存
//!
//! 单个多路复用连接，RwLock 保护，出错时重置并在下次调用重建。
//! 所有操作都有超时上限，超时按 Unavailable 处理（由各 guard 自行
//! fail-open）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::{AdmissionCache, CounterOutcome, CreateOutcome};
use crate::config::RedisConfig;
use crate::errors::{Result, TrackgateError};

pub struct RedisAdmissionCache {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisAdmissionCache {
    /// Create the cache and verify the server is reachable.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.clone())
            .map_err(|e| TrackgateError::cache_connection(format!("invalid redis url: {e}")))?;

        let cache = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: config.key_prefix.clone(),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        };

        // 启动时验证连通性，之后的故障按 fail-open 处理
        let mut conn = cache
            .get_connection()
            .await
            .map_err(|e| TrackgateError::cache_connection(format!("redis ping failed: {e}")))?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TrackgateError::cache_connection(format!("redis ping failed: {e}")))?;
        debug!("Redis connection test successful: {}", pong);

        Ok(cache)
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        // 首先尝试读取现有连接
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        // 需要建立新连接
        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl AdmissionCache for RedisAdmissionCache {
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> CreateOutcome {
        let redis_key = self.make_key(key);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return CreateOutcome::Unavailable;
            }
        };

        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1));

        match timeout(self.op_timeout, cmd.query_async::<Option<String>>(&mut conn)).await {
            Ok(Ok(Some(_))) => CreateOutcome::Created,
            Ok(Ok(None)) => CreateOutcome::Exists,
            Ok(Err(e)) => {
                error!("Failed to SET NX key '{}': {}", redis_key, e);
                self.reset_connection().await;
                CreateOutcome::Unavailable
            }
            Err(_) => {
                warn!("Redis SET NX timed out for key '{}'", redis_key);
                CreateOutcome::Unavailable
            }
        }
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> CounterOutcome {
        let redis_key = self.make_key(key);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return CounterOutcome::Unavailable;
            }
        };

        let mut cmd = redis::cmd("INCR");
        cmd.arg(&redis_key);

        let value = match timeout(self.op_timeout, cmd.query_async::<i64>(&mut conn)).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                error!("Failed to INCR key '{}': {}", redis_key, e);
                self.reset_connection().await;
                return CounterOutcome::Unavailable;
            }
            Err(_) => {
                warn!("Redis INCR timed out for key '{}'", redis_key);
                return CounterOutcome::Unavailable;
            }
        };

        // 第一个写入者负责设置过期时间
        if value == 1 {
            let mut expire = redis::cmd("EXPIRE");
            expire.arg(&redis_key).arg(ttl.as_secs().max(1));
            if let Ok(Err(e)) = timeout(self.op_timeout, expire.query_async::<i64>(&mut conn)).await
            {
                // 计数仍然有效，只是这个 bucket 不会自动过期
                warn!("Failed to EXPIRE key '{}': {}", redis_key, e);
            }
        }

        CounterOutcome::Counted(value)
    }
}
