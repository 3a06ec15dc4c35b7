use std::path::PathBuf;
use std::time::Duration;

use crate::cache::normalize_scheme;
use crate::flickr::{DEFAULT_TIMEOUT_SECS, FLICKR_ENDPOINT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub mcp_path: String,
    pub cache_dir: PathBuf,
    pub cache_base_url: String,
    pub flickr_endpoint: String,
    pub flickr_api_key: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match var("MCP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "MCP_PORT",
                value: raw,
            })?,
            None => 3000,
        };
        let bind_address = format!("0.0.0.0:{port}");

        let mcp_path = match var("SECRET_KEY") {
            Some(secret) => format!("/{}/mcp", secret.trim()),
            None => "/mcp".to_string(),
        };

        let cache_dir = var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);
        let cache_base_url = resolve_cache_base_url(
            var("CACHE_URL").as_deref(),
            var("DOMAIN").as_deref(),
            &bind_address,
        );

        let flickr_api_key = var("FLICKR_API_KEY")
            .map(|key| key.trim().to_string())
            .ok_or(ConfigError::Missing("FLICKR_API_KEY"))?;
        let flickr_endpoint = var("FLICKR_ENDPOINT")
            .map(|endpoint| endpoint.trim().to_string())
            .unwrap_or_else(|| FLICKR_ENDPOINT.to_string());

        let timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "REQUEST_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            bind_address,
            mcp_path,
            cache_dir,
            cache_base_url,
            flickr_endpoint,
            flickr_api_key,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn default_cache_dir() -> PathBuf {
    let mut base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("virtual-tourist");
    base
}

fn resolve_cache_base_url(cache_url: Option<&str>, domain: Option<&str>, bind_address: &str) -> String {
    if let Some(cache_url) = cache_url {
        return format!("{}/cache", cache_url.trim().trim_end_matches('/'));
    }
    let trimmed = domain.unwrap_or(bind_address).trim();
    let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    };
    format!("{}/cache", normalize_scheme(&base))
}
