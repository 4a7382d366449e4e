use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{var}='{value}' is invalid: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Where the tools find the catalog API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Base URL without trailing slash.
    pub api_base_url: String,
    pub timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ToolsConfig {
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `STOCKROOM_API_URL`           | `http://localhost:8080` |
    /// | `STOCKROOM_API_TIMEOUT_SECS`  | `10`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("STOCKROOM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError {
                var: "STOCKROOM_API_URL",
                value: api_base_url,
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let timeout_secs = match lookup("STOCKROOM_API_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError {
                var: "STOCKROOM_API_TIMEOUT_SECS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
        };

        Ok(Self::new(api_base_url, Duration::from_secs(timeout_secs)))
    }
}
