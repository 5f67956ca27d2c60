use std::str::FromStr;

use anyhow::{Context, Result, bail};
use crates::infra::file_hosts::pixeldrain::PixeldrainConfig;

use super::config_model::{Access, DotEnvyConfig, GatewayServer, UploadRetry};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let gateway_server = GatewayServer {
        host: parse_or(&lookup, "GATEWAY_HOST", "127.0.0.1")?,
        port: parse_or(&lookup, "GATEWAY_PORT", "7071")?,
        body_limit: parse_or(&lookup, "GATEWAY_BODY_LIMIT_MB", "512")?,
        timeout: parse_or(&lookup, "GATEWAY_TIMEOUT", "900")?,
    };

    if gateway_server.body_limit == 0 {
        bail!("GATEWAY_BODY_LIMIT_MB must be greater than zero");
    }
    if gateway_server.body_limit_bytes().is_none() {
        bail!(
            "GATEWAY_BODY_LIMIT_MB is too large (value: {})",
            gateway_server.body_limit
        );
    }
    if gateway_server.timeout == 0 {
        bail!("GATEWAY_TIMEOUT must be greater than zero");
    }

    let access = Access {
        allow_remote: parse_bool_or(&lookup, "GATEWAY_ALLOW_REMOTE", false)?,
        token: optional(&lookup, "GATEWAY_TOKEN"),
    };

    let pixeldrain = PixeldrainConfig {
        api_url: optional(&lookup, "PIXELDRAIN_API_URL")
            .unwrap_or_else(|| "https://pixeldrain.com/api".to_string()),
        share_url: optional(&lookup, "PIXELDRAIN_SHARE_URL")
            .unwrap_or_else(|| "https://pixeldrain.com/u".to_string()),
        api_key: optional(&lookup, "PIXELDRAIN_API_KEY"),
        timeout_secs: parse_or(&lookup, "PIXELDRAIN_TIMEOUT", "600")?,
        connect_timeout_secs: parse_or(&lookup, "PIXELDRAIN_CONNECT_TIMEOUT", "10")?,
    };

    let upload_retry = UploadRetry {
        max_attempts: parse_or(&lookup, "UPLOAD_RETRY_MAX_ATTEMPTS", "3")?,
        initial_delay_ms: parse_or(&lookup, "UPLOAD_RETRY_INITIAL_DELAY_MS", "500")?,
        max_delay_ms: parse_or(&lookup, "UPLOAD_RETRY_MAX_DELAY_MS", "10000")?,
    };

    if upload_retry.max_attempts == 0 {
        bail!("UPLOAD_RETRY_MAX_ATTEMPTS must be at least 1");
    }

    Ok(DotEnvyConfig {
        gateway_server,
        access,
        pixeldrain,
        upload_retry,
    })
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = optional(lookup, key).unwrap_or_else(|| default.to_string());

    raw.parse()
        .with_context(|| format!("{} is invalid (value: {})", key, raw))
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = optional(lookup, key) else {
        return Ok(default);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => bail!("{} is invalid (value: {})", key, raw),
    }
}
