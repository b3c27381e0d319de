//! Configuration management for Insight Agent.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8501`.
//! - `DEFAULT_MODEL` - Optional. Chat model identifier. Defaults to `gpt-3.5-turbo`.
//! - `OPENAI_BASE_URL` - Optional. OpenAI-compatible API root. Defaults to `https://api.openai.com/v1`.
//! - `SERPAPI_BASE_URL` - Optional. SerpAPI root. Defaults to `https://serpapi.com`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `15`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Timeout for outbound HTTP calls. Defaults to `60`.
//! - `SECRETS_PATH` - Optional. TOML secrets file. Defaults to `.secrets/secrets.toml`.
//! - `OPENAI_API_KEY` / `SERPAPI_API_KEY` - Optional. Used when the secrets file has no keys.
//!
//! The secrets file looks like:
//!
//! ```toml
//! [api_keys]
//! openai = "sk-..."
//! serpapi = "..."
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read secrets file {0}: {1}")]
    SecretsFile(PathBuf, String),
}

/// The two secrets a run needs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Key for the chat-completions API
    pub openai_api_key: String,

    /// Key for the SerpAPI search backend
    pub serpapi_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("serpapi_api_key", &redact(&self.serpapi_api_key))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl Credentials {
    pub fn new(openai_api_key: impl Into<String>, serpapi_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            serpapi_api_key: serpapi_api_key.into(),
        }
    }

    /// Both keys present (non-blank).
    pub fn is_complete(&self) -> bool {
        !self.openai_api_key.trim().is_empty() && !self.serpapi_api_key.trim().is_empty()
    }

    /// Overlay per-submission values: a non-empty field replaces the stored key.
    pub fn overridden_by(&self, openai: Option<&str>, serpapi: Option<&str>) -> Self {
        fn pick(field: Option<&str>, fallback: &str) -> String {
            match field.map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => fallback.to_string(),
            }
        }

        Self {
            openai_api_key: pick(openai, &self.openai_api_key),
            serpapi_api_key: pick(serpapi, &self.serpapi_api_key),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    api_keys: ApiKeys,
}

#[derive(Debug, Default, Deserialize)]
struct ApiKeys {
    openai: Option<String>,
    serpapi: Option<String>,
}

/// Load credentials from a TOML secrets file.
///
/// A missing file yields empty credentials; a malformed one is an error.
pub fn load_secrets(path: &Path) -> Result<Credentials, ConfigError> {
    if !path.exists() {
        return Ok(Credentials::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::SecretsFile(path.to_path_buf(), e.to_string()))?;
    let parsed: SecretsFile = toml::from_str(&raw)
        .map_err(|e| ConfigError::SecretsFile(path.to_path_buf(), e.to_string()))?;

    Ok(Credentials {
        openai_api_key: parsed.api_keys.openai.unwrap_or_default(),
        serpapi_api_key: parsed.api_keys.serpapi.unwrap_or_default(),
    })
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Chat model identifier
    pub default_model: String,

    /// Root of the OpenAI-compatible API
    pub openai_base_url: String,

    /// Root of the SerpAPI service
    pub serpapi_base_url: String,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,

    /// Credentials from the secret store / environment. May be empty, in
    /// which case the page must supply them.
    pub credentials: Credentials,
}

impl Config {
    /// Load configuration from environment variables and the secrets file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparsable numbers and
    /// `ConfigError::SecretsFile` for an unreadable secrets file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_env("PORT", 8501)?;
        let max_iterations = parse_env("MAX_ITERATIONS", 15)?;
        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 60)?;

        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let serpapi_base_url =
            std::env::var("SERPAPI_BASE_URL").unwrap_or_else(|_| "https://serpapi.com".to_string());

        let secrets_path = std::env::var("SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".secrets/secrets.toml"));

        let credentials = load_secrets(&secrets_path)?;
        let credentials = Credentials {
            openai_api_key: non_empty_or_env(credentials.openai_api_key, "OPENAI_API_KEY"),
            serpapi_api_key: non_empty_or_env(credentials.serpapi_api_key, "SERPAPI_API_KEY"),
        };

        Ok(Self {
            host,
            port,
            default_model,
            openai_base_url: trim_base_url(openai_base_url),
            serpapi_base_url: trim_base_url(serpapi_base_url),
            max_iterations,
            request_timeout_secs,
            credentials,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(default_model: String, credentials: Credentials) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            default_model,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            serpapi_base_url: "https://serpapi.com".to_string(),
            max_iterations: 15,
            request_timeout_secs: 60,
            credentials,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn non_empty_or_env(value: String, var: &str) -> String {
    if value.trim().is_empty() {
        std::env::var(var).unwrap_or_default()
    } else {
        value
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
