use crate::github::{
    config::GitHubConfig,
    models::{ApiErrorBody, Contents, RepositorySummary, SearchResponse},
    parser::RepositoryRef,
    rate_limiter::{RateLimitStatus, RateLimiter},
};
use crate::{Error, Result};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Results per page for repository search
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// How a failed response is turned into an [`Error`]
struct FailurePolicy {
    /// Fixed message for 404; `None` keeps the upstream message
    not_found: Option<&'static str>,
    /// Used when the upstream error body has no message
    fallback: &'static str,
}

/// GitHub API client
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
    rate_limiter: RateLimiter,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("code-insights/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        // Unauthenticated requests are allowed, with a lower rate limit
        if let Some(token) = &config.token {
            let mut auth_value = header::HeaderValue::from_str(&format!("token {token}"))
                .map_err(|e| Error::Config(format!("Invalid GitHub token: {e}")))?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        } else {
            debug!("No GITHUB_TOKEN configured, using unauthenticated requests");
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        let rate_limiter = RateLimiter::new(config.rate_limit_warn_threshold);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Make a GET request to GitHub API
    async fn get<T>(&self, path: &str, policy: FailurePolicy) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.rate_limiter.is_exhausted().await {
            warn!("GitHub rate limit exhausted, request will likely fail: {}", path);
        }

        let url = format!("{}{}", self.config.api_base_url(), path);
        debug!("GitHub API request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GitHub API request failed: {e}")))?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;

        let status = response.status();

        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            warn!(
                "GitHub API error: {} - {}",
                status,
                body.message.as_deref().unwrap_or("<no message>")
            );

            if status == StatusCode::NOT_FOUND {
                let message = match policy.not_found {
                    Some(fixed) => fixed.to_string(),
                    None => body.message.unwrap_or_else(|| policy.fallback.to_string()),
                };
                return Err(Error::NotFound(message));
            }

            return Err(Error::Upstream(
                body.message.unwrap_or_else(|| policy.fallback.to_string()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse GitHub API response: {e}")))
    }

    /// List public repositories owned by a user
    pub async fn list_user_repos(&self, username: &str) -> Result<Vec<RepositorySummary>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("Username cannot be empty".to_string()));
        }

        let path = format!("/users/{}/repos", urlencoding::encode(username));
        self.get(
            &path,
            FailurePolicy {
                not_found: Some("User not found."),
                fallback: "Failed to fetch repositories.",
            },
        )
        .await
    }

    /// Get the contents at `path`: a shallow listing for a directory, a blob for a file
    pub async fn get_contents(&self, repo: &RepositoryRef, path: &str) -> Result<Contents> {
        let api_path = format!(
            "/repos/{}/{}/contents/{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            encode_path(path)
        );
        self.get(
            &api_path,
            FailurePolicy {
                not_found: None,
                fallback: "Failed to fetch repository contents.",
            },
        )
        .await
    }

    /// Get repository information
    pub async fn get_repository(&self, repo: &RepositoryRef) -> Result<RepositorySummary> {
        let path = format!(
            "/repos/{}/{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name)
        );
        self.get(
            &path,
            FailurePolicy {
                not_found: Some("Repository not found."),
                fallback: "Failed to fetch repository details.",
            },
        )
        .await
    }

    /// Search repositories by keyword, most starred first
    pub async fn search_repositories(&self, query: &str) -> Result<Vec<RepositorySummary>> {
        let path = format!(
            "/search/repositories?q={}&sort=stars&order=desc&per_page={}",
            urlencoding::encode(query),
            SEARCH_PAGE_SIZE
        );
        let response: SearchResponse = self
            .get(
                &path,
                FailurePolicy {
                    not_found: None,
                    fallback: "Failed to search repositories.",
                },
            )
            .await?;
        Ok(response.items)
    }

    /// Get current rate limit status
    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.status().await
    }
}

/// Percent-encode each segment of a repository path, keeping separators
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
