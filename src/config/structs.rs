use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub bot: BotConfig,
    pub geoip: GeoIpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL clients reach this service at (used in generated
    /// SDK scripts and interstitial pages)
    pub export_url: String,
    /// Proxies whose X-Forwarded-For we trust (IPs or CIDR blocks)
    pub trusted_proxies: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            export_url: "http://127.0.0.1:8080".to_string(),
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file path; empty/None logs to stdout
    pub file: Option<String>,
    /// "text" or "json"
    pub format: String,
    pub enable_rotation: bool,
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            enable_rotation: true,
            max_backups: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sea-orm connection URL (postgres://, mysql:// or sqlite://)
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://trackgate.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
    /// Upper bound for any single cache round trip; expiry counts as
    /// "cache unavailable" for the fail-open guards
    pub op_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "tg:".to_string(),
            op_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Accepted drift between the claimed submission timestamp and now
    pub ts_window_seconds: u32,
    /// Retention of single-use nonce markers
    pub nonce_ttl_seconds: u32,
    /// Retention of click dedup markers
    pub dedup_seconds: u32,
    pub private_key_path: String,
    pub public_key_path: String,
    /// Informational key id handed to clients with the public key
    pub kid: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            ts_window_seconds: 300,
            nonce_ttl_seconds: 600,
            dedup_seconds: 600,
            private_key_path: "keys/trackgate_rsa.pem".to_string(),
            public_key_path: "keys/trackgate_rsa.pub.pem".to_string(),
            kid: "k1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub per_ip_per_minute: u32,
    pub per_ip_ua_per_minute: u32,
    pub per_tracker_ip_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_ip_per_minute: 120,
            per_ip_ua_per_minute: 60,
            per_tracker_ip_per_minute: 30,
        }
    }
}

/// What the orchestrator does with a "blocked" bot verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotBlockMode {
    /// Reject the submission outright
    Reject,
    /// Accept and persist, flags set
    #[default]
    Flag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub mark_threshold: u8,
    pub block_threshold: u8,
    pub block_mode: BotBlockMode,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            mark_threshold: 50,
            block_threshold: 80,
            block_mode: BotBlockMode::Flag,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoIpConfig {
    /// Path to a MaxMind Country mmdb; None disables country lookup
    pub mmdb_path: Option<String>,
}
