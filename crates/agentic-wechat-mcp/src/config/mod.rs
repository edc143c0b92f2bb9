//! Configuration loading and resolution.

use std::path::PathBuf;

use agentic_wechat::ClientConfig;

pub const APPID_ENV: &str = "WECHAT_APPID";
pub const SECRET_ENV: &str = "WECHAT_SECRET";
pub const CACHE_DIR_ENV: &str = "WECHAT_CACHE_DIR";

/// Resolve the cache directory: explicit flag, then `WECHAT_CACHE_DIR`,
/// then `~/.agentic-wechat/cache`.
pub fn resolve_cache_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Ok(env_dir) = std::env::var(CACHE_DIR_ENV) {
        if !env_dir.is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agentic-wechat")
        .join("cache")
}

/// Build the upstream configuration from `WECHAT_APPID` / `WECHAT_SECRET`.
pub fn client_config_from_env() -> ClientConfig {
    client_config(
        std::env::var(APPID_ENV).ok().as_deref(),
        std::env::var(SECRET_ENV).ok().as_deref(),
    )
}

/// Credentials are only set when both values are present and non-blank.
pub fn client_config(app_id: Option<&str>, app_secret: Option<&str>) -> ClientConfig {
    let config = ClientConfig::default();
    match (app_id.map(str::trim), app_secret.map(str::trim)) {
        (Some(id), Some(secret)) => config.with_credentials(id, secret),
        _ => {
            tracing::warn!(
                "{APPID_ENV} / {SECRET_ENV} not set; official account tools will report a configuration error"
            );
            config
        }
    }
}
