//! Application configuration
//!
//! Loaded once at startup from an optional `trackgate.toml` plus
//! `TRACKGATE_*` environment overrides, then passed by `Arc` to every
//! component constructor. Nothing reads configuration ambiently after
//! startup.

mod structs;

pub use structs::*;

use crate::errors::Result;

/// Load configuration from file + environment.
///
/// Search order: `./trackgate.toml`, `./config/trackgate.toml`, then
/// environment variables with the `TRACKGATE` prefix (`__` as section
/// separator, e.g. `TRACKGATE_REDIS__URL`). Missing files are fine;
/// every field has a default.
pub fn load() -> Result<AppConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name("trackgate").required(false))
        .add_source(config::File::with_name("config/trackgate").required(false))
        .add_source(config::Environment::with_prefix("TRACKGATE").separator("__"))
        .build()?;

    Ok(cfg.try_deserialize()?)
}
