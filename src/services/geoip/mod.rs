//! GeoIP Provider 抽象层
//!
//! 统一的国家代码查询接口。配置了 mmdb 路径且文件可读时使用 MaxMind
//! 数据库，否则查询一律返回 None（记录仍然落库，只是缺少国家字段）。

mod maxmind;

pub use maxmind::MaxMindProvider;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::GeoIpConfig;

/// 国家代码查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// ISO 3166-1 alpha-2 国家代码 (e.g., "CN", "US")
    async fn country(&self, ip: &str) -> Option<String>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 统一 GeoIP Provider，best-effort：任何失败都表现为 None。
pub struct GeoIpProvider {
    inner: Option<Arc<dyn GeoIpLookup>>,
}

impl GeoIpProvider {
    pub fn new(config: &GeoIpConfig) -> Self {
        let inner: Option<Arc<dyn GeoIpLookup>> = match &config.mmdb_path {
            Some(path) => match MaxMindProvider::new(path) {
                Ok(provider) => {
                    info!("GeoIP: Using MaxMind database at {}", path);
                    Some(Arc::new(provider))
                }
                Err(e) => {
                    warn!(
                        "GeoIP: Failed to load MaxMind database at {}: {}, country lookup disabled",
                        path, e
                    );
                    None
                }
            },
            None => None,
        };

        Self { inner }
    }

    /// 构造一个永远返回 None 的 provider（测试用）
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub async fn country(&self, ip: &str) -> Option<String> {
        match &self.inner {
            Some(provider) => provider.country(ip).await,
            None => None,
        }
    }
}
