use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Hosted language model configuration
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key; flows fail with a configuration error when absent
    pub api_key: Option<String>,

    /// API base URL, without trailing slash
    pub api_base_url: String,

    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl AiConfig {
    /// Create a new AiConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = ["AI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()));

        Self {
            api_key,
            api_base_url: env::var("AI_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            model: env::var("AI_MODEL").unwrap_or(defaults.model),
            timeout_secs: env::var("AI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}
