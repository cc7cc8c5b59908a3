use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RegistryError;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_BASE_URL: &str = "https://registry.terraform.io";

/// Per-attempt HTTP timeout in milliseconds (30 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Requests admitted per rate-limit period
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;

/// Rate-limit period in milliseconds (1 minute)
pub const DEFAULT_RATE_LIMIT_PERIOD_MS: u64 = 60_000;

/// One initial attempt plus three retries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

pub const DEFAULT_MIN_WAIT_MS: u64 = 1_000;
pub const DEFAULT_MAX_WAIT_MS: u64 = 30_000;

/// Circuit breaker for full-listing traversal
pub const DEFAULT_MAX_PAGES: usize = 100;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size the policy listing accepts
pub const MAX_PAGE_SIZE: u32 = 100;

const CONFIG_FILE_NAME: &str = "config.json";

pub fn default_user_agent() -> String {
    format!("registry-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Client configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Sent as a bearer token when set
    pub api_token: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub search: SearchConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: default_user_agent(),
            api_token: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Token-bucket budget shared by every request of one client
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub requests: u32,
    pub period_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            period_ms: DEFAULT_RATE_LIMIT_PERIOD_MS,
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Retry budget and exponential backoff bounds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait_ms: DEFAULT_MIN_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    pub max_pages: usize,
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| RegistryError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Load from the default location when a file exists there, otherwise
    /// fall back to defaults.
    pub fn load_or_default() -> Result<Self, RegistryError> {
        let path = config_path();
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let base_url = self.base_url();
        if base_url.is_empty() {
            return Err(RegistryError::Config("baseUrl cannot be empty".to_string()));
        }
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| RegistryError::Config(format!("invalid baseUrl {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::Config(format!(
                "baseUrl must use http or https: {}",
                base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(RegistryError::Config("timeoutMs must be greater than 0".to_string()));
        }
        if self.rate_limit.requests == 0 || self.rate_limit.period_ms == 0 {
            return Err(RegistryError::Config(
                "rateLimit.requests and rateLimit.periodMs must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(RegistryError::Config(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.retry.min_wait_ms > self.retry.max_wait_ms {
            return Err(RegistryError::Config(format!(
                "retry.minWaitMs ({}) exceeds retry.maxWaitMs ({})",
                self.retry.min_wait_ms, self.retry.max_wait_ms
            )));
        }
        if self.search.max_pages == 0 {
            return Err(RegistryError::Config(
                "search.maxPages must be greater than 0".to_string(),
            ));
        }
        if self.search.page_size == 0 || self.search.page_size > MAX_PAGE_SIZE {
            return Err(RegistryError::Config(format!(
                "search.pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// Returns the path to the config directory for registry-client.
/// Uses $XDG_CONFIG_HOME/registry-client if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/registry-client,
/// or ./registry-client if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join("registry-client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn client_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<ClientConfig>(json!({
            "retry": {
                "maxAttempts": 2
            }
        }))
        .unwrap();

        assert_eq!(result.retry.max_attempts, 2);
        assert_eq!(result.retry.min_wait_ms, DEFAULT_MIN_WAIT_MS);
        assert_eq!(result.base_url, DEFAULT_BASE_URL);
        assert_eq!(result.rate_limit, RateLimitConfig::default());
        assert_eq!(result.search, SearchConfig::default());
    }

    #[test]
    fn client_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<ClientConfig>(json!({
            "baseUrl": "http://localhost:8080/",
            "timeoutMs": 5000,
            "userAgent": "custom-agent",
            "apiToken": "secret",
            "rateLimit": { "requests": 10, "periodMs": 1000 },
            "retry": { "maxAttempts": 3, "minWaitMs": 100, "maxWaitMs": 500 },
            "search": { "maxPages": 5, "pageSize": 20 }
        }))
        .unwrap();

        assert_eq!(
            result,
            ClientConfig {
                base_url: "http://localhost:8080/".to_string(),
                timeout_ms: 5000,
                user_agent: "custom-agent".to_string(),
                api_token: Some("secret".to_string()),
                rate_limit: RateLimitConfig {
                    requests: 10,
                    period_ms: 1000
                },
                retry: RetryConfig {
                    max_attempts: 3,
                    min_wait_ms: 100,
                    max_wait_ms: 500
                },
                search: SearchConfig {
                    max_pages: 5,
                    page_size: 20
                },
            }
        );
        assert_eq!(result.base_url(), "http://localhost:8080");
        assert_eq!(result.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.user_agent.starts_with("registry-client/"));
    }

    #[rstest]
    #[case::empty_base_url(json!({ "baseUrl": "" }))]
    #[case::unparsable_base_url(json!({ "baseUrl": "not a url" }))]
    #[case::non_http_base_url(json!({ "baseUrl": "ftp://registry.example" }))]
    #[case::zero_timeout(json!({ "timeoutMs": 0 }))]
    #[case::zero_requests(json!({ "rateLimit": { "requests": 0 } }))]
    #[case::zero_period(json!({ "rateLimit": { "periodMs": 0 } }))]
    #[case::zero_attempts(json!({ "retry": { "maxAttempts": 0 } }))]
    #[case::min_above_max(json!({ "retry": { "minWaitMs": 5000, "maxWaitMs": 100 } }))]
    #[case::zero_pages(json!({ "search": { "maxPages": 0 } }))]
    #[case::oversized_page(json!({ "search": { "pageSize": 101 } }))]
    fn validate_rejects_invalid_values(#[case] value: serde_json::Value) {
        let result = ClientConfig::from_json_str(&value.to_string());
        assert!(matches!(result, Err(RegistryError::Config(_))), "{:?}", result);
    }

    #[test]
    fn from_json_str_reports_malformed_json() {
        let result = ClientConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(RegistryError::Config(ref m)) if m.contains("failed to parse")));
    }

    #[test]
    fn load_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rateLimit": {{"requests": 7}}}}"#).unwrap();

        let config = ClientConfig::load(file.path()).unwrap();

        assert_eq!(config.rate_limit.requests, 7);
        assert_eq!(config.rate_limit.period(), Duration::from_secs(60));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(RegistryError::Config(_))));
    }

    #[test]
    fn config_dir_with_env_uses_xdg_config_home_when_set() {
        let path = config_dir_with_env(
            Some("/tmp/test-config".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-config/registry-client"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_home_config() {
        let path = config_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.config/registry-client"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = config_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./registry-client"));
    }
}
