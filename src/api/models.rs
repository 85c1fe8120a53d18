use serde::{Deserialize, Serialize};

use crate::github::RepositorySummary;

/// Query parameters naming a repository
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoParams {
    pub repo_url: String,
    #[serde(default)]
    pub path: String,
}

/// GET /api/repos/tree parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeParams {
    pub repo_url: String,
    #[serde(default)]
    pub path: String,
    /// Annotate nodes with sizes and keep upstream order
    #[serde(default)]
    pub sizes: bool,
}

/// Search request parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReposResponse {
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoUrlRequest {
    pub repo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsRequest {
    pub repo_url: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub repo_url: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsernameRequest {
    pub username: Option<String>,
}

/// Result of a session query that may have been superseded
#[derive(Debug, Clone, Serialize)]
pub struct AppliedResponse<T> {
    pub applied: bool,
    pub session: T,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub ready: bool,
    pub github_authenticated: bool,
    pub github_rate_limit_remaining: u32,
    pub ai_configured: bool,
    pub sessions: usize,
    pub tree_fetches_in_flight: usize,
}
