use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub integration configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Optional GitHub personal access token for increased rate limits
    pub token: Option<String>,

    /// REST API base URL, without trailing slash
    pub api_base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of in-flight GitHub requests during tree walks and lookups
    pub max_concurrency: usize,

    /// Warn once remaining requests drop to this many
    pub rate_limit_warn_threshold: u32,
}

impl GitHubConfig {
    /// Create a new GitHubConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            api_base_url: env::var("GITHUB_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            timeout_secs: env::var("GITHUB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_concurrency: env::var("TREE_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrency),
            rate_limit_warn_threshold: env::var("GITHUB_RATE_LIMIT_WARN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_warn_threshold),
        }
    }

    /// Config pointing at a different API host, used against local mock servers
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Get the base API URL
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 30,
            max_concurrency: 8,
            rate_limit_warn_threshold: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let config = GitHubConfig::with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.api_base_url(), "http://127.0.0.1:1234");
        assert!(!config.is_authenticated());
    }
}
