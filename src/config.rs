//! Configuration management for engineer-chat.
//!
//! Configuration is read from environment variables:
//! - `OPENAI_API_KEY` - Required. Key for the chat-completion endpoint.
//! - `TAVILY_API_KEY` - Required. Key for the web search provider.
//! - `OPENAI_BASE_URL` - Optional. Defaults to `https://api.openai.com/v1`.
//! - `TAVILY_BASE_URL` - Optional. Defaults to `https://api.tavily.com`.
//! - `DEFAULT_MODEL` - Optional. The model to chat with. Defaults to `gpt-4o`.
//! - `WORKSPACE_PATH` - Optional. Base directory for relative tool paths. Defaults to current directory.
//! - `MAX_ROUNDS` - Optional. Maximum model rounds per user message. Defaults to `25`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. HTTP timeout for model and search calls. Defaults to `120`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_ROUNDS: usize = 25;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completion API key
    pub openai_api_key: String,

    /// Search provider API key
    pub tavily_api_key: String,

    /// Chat-completion base URL (OpenAI-compatible)
    pub openai_base_url: String,

    /// Search provider base URL
    pub tavily_base_url: String,

    /// Model identifier sent with every completion request
    pub default_model: String,

    /// Directory that relative tool paths resolve against
    pub workspace_path: PathBuf,

    /// Maximum model rounds for one user message
    pub max_rounds: usize,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if either API key is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let openai_api_key = required("OPENAI_API_KEY")?;
        let tavily_api_key = required("TAVILY_API_KEY")?;

        let openai_base_url = var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let tavily_base_url = var("TAVILY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TAVILY_BASE_URL.to_string());

        let default_model = var("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let workspace_path = var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let max_rounds: usize = var("MAX_ROUNDS")
            .map(|v| {
                v.parse()
                    .map_err(|e| ConfigError::InvalidValue("MAX_ROUNDS".to_string(), format!("{}", e)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ROUNDS);
        if max_rounds == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ROUNDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .map(|v| {
                v.parse().map_err(|e| {
                    ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".to_string(), format!("{}", e))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            openai_api_key,
            tavily_api_key,
            openai_base_url,
            tavily_base_url,
            default_model,
            workspace_path,
            max_rounds,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(openai_api_key: String, tavily_api_key: String, workspace_path: PathBuf) -> Self {
        Self {
            openai_api_key,
            tavily_api_key,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            tavily_base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            workspace_path,
            max_rounds: DEFAULT_MAX_ROUNDS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_openai_key_fails_fast() {
        let err = load(&[("TAVILY_API_KEY", "tv")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn blank_search_key_counts_as_missing() {
        let err = load(&[("OPENAI_API_KEY", "sk"), ("TAVILY_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TAVILY_API_KEY"));
    }

    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        let config = load(&[("OPENAI_API_KEY", "sk"), ("TAVILY_API_KEY", "tv")]).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.max_rounds, DEFAULT_MAX_ROUNDS);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn zero_max_rounds_is_rejected() {
        let err = load(&[
            ("OPENAI_API_KEY", "sk"),
            ("TAVILY_API_KEY", "tv"),
            ("MAX_ROUNDS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "MAX_ROUNDS"));
    }

    #[test]
    fn non_numeric_timeout_is_rejected() {
        let err = load(&[
            ("OPENAI_API_KEY", "sk"),
            ("TAVILY_API_KEY", "tv"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "REQUEST_TIMEOUT_SECS"));
    }
}
