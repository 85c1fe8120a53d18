use crate::ai::AiConfig;
use crate::error::{Error, Result};
use crate::github::GitHubConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second allowed per client IP on the JSON API
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_rate_limit: 20,
            max_request_body_size: 1_048_576,
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let api_rate_limit = std::env::var("API_RATE_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid API_RATE_LIMIT value".to_string()))?;

        let max_request_body_size = std::env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| "1048576".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_REQUEST_BODY_SIZE value".to_string()))?;

        Ok(Settings {
            server: ServerConfig {
                host,
                port,
                api_rate_limit,
                max_request_body_size,
            },
            github: GitHubConfig::from_env(),
            ai: AiConfig::from_env(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        if self.github.max_concurrency == 0 {
            return Err(Error::Config(
                "TREE_MAX_CONCURRENCY must be non-zero".to_string(),
            ));
        }

        url::Url::parse(&self.github.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid GITHUB_API_URL: {e}")))?;
        url::Url::parse(&self.ai.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid AI_API_URL: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                ..ServerConfig::default()
            },
            github: GitHubConfig::default(),
            ai: AiConfig::default(),
        }
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = test_settings();
        assert!(settings.validate().is_ok());

        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut settings = test_settings();
        settings.github.max_concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bad_api_url_rejected() {
        let mut settings = test_settings();
        settings.github.api_base_url = "not a url".to_string();
        assert!(settings.validate().is_err());
    }
}
