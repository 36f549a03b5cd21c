use std::fmt;

#[derive(Debug, Clone)]
pub enum TrackgateError {
    CacheConnection(String),
    Config(String),
    Crypto(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    NotFound(String),
    Serialization(String),
    Validation(String),
}

impl TrackgateError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            TrackgateError::CacheConnection(_) => "E001",
            TrackgateError::Config(_) => "E002",
            TrackgateError::Crypto(_) => "E003",
            TrackgateError::DatabaseConnection(_) => "E004",
            TrackgateError::DatabaseOperation(_) => "E005",
            TrackgateError::FileOperation(_) => "E006",
            TrackgateError::NotFound(_) => "E007",
            TrackgateError::Serialization(_) => "E008",
            TrackgateError::Validation(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TrackgateError::CacheConnection(_) => "Cache Connection Error",
            TrackgateError::Config(_) => "Configuration Error",
            TrackgateError::Crypto(_) => "Cryptography Error",
            TrackgateError::DatabaseConnection(_) => "Database Connection Error",
            TrackgateError::DatabaseOperation(_) => "Database Operation Error",
            TrackgateError::FileOperation(_) => "File Operation Error",
            TrackgateError::NotFound(_) => "Resource Not Found",
            TrackgateError::Serialization(_) => "Serialization Error",
            TrackgateError::Validation(_) => "Validation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            TrackgateError::CacheConnection(msg)
            | TrackgateError::Config(msg)
            | TrackgateError::Crypto(msg)
            | TrackgateError::DatabaseConnection(msg)
            | TrackgateError::DatabaseOperation(msg)
            | TrackgateError::FileOperation(msg)
            | TrackgateError::NotFound(msg)
            | TrackgateError::Serialization(msg)
            | TrackgateError::Validation(msg) => msg,
        }
    }
}

impl fmt::Display for TrackgateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for TrackgateError {}

// 便捷的构造函数
impl TrackgateError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        TrackgateError::CacheConnection(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        TrackgateError::Config(msg.into())
    }

    pub fn crypto<T: Into<String>>(msg: T) -> Self {
        TrackgateError::Crypto(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        TrackgateError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        TrackgateError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        TrackgateError::FileOperation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TrackgateError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        TrackgateError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        TrackgateError::Validation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TrackgateError {
    fn from(err: sea_orm::DbErr) -> Self {
        TrackgateError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for TrackgateError {
    fn from(err: std::io::Error) -> Self {
        TrackgateError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TrackgateError {
    fn from(err: serde_json::Error) -> Self {
        TrackgateError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TrackgateError {
    fn from(err: config::ConfigError) -> Self {
        TrackgateError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackgateError>;
