use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
    api::models::*,
    github::{Contents, RepositorySummary},
    insights::{Analysis, DocumentedFile, Insights, SuggestOutcome},
    session::{ChatSession, SessionSnapshot, SessionStore},
    tree::{TreeNode, TreeOptions},
    Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub insights: Insights,
    pub sessions: SessionStore,
    pub settings: crate::config::Settings,
}

/// GET /api/users/:username/repos - List a user's public repositories
pub async fn list_user_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ReposResponse>> {
    debug!("List repos request: {}", username);

    let repositories = state.insights.user_repos(&username).await?;
    Ok(Json(ReposResponse { repositories }))
}

/// GET /api/repos?repoUrl= - Repository details
pub async fn get_repository(
    State(state): State<AppState>,
    Query(params): Query<RepoParams>,
) -> Result<Json<RepositorySummary>> {
    Ok(Json(state.insights.repository(&params.repo_url).await?))
}

/// GET /api/repos/contents?repoUrl=&path= - Raw contents listing or file blob
pub async fn get_contents(
    State(state): State<AppState>,
    Query(params): Query<RepoParams>,
) -> Result<Json<Contents>> {
    debug!("Contents request: {} '{}'", params.repo_url, params.path);

    Ok(Json(
        state
            .insights
            .contents(&params.repo_url, &params.path)
            .await?,
    ))
}

/// GET /api/repos/tree?repoUrl=&path=&sizes= - Recursive file tree
pub async fn get_tree(
    State(state): State<AppState>,
    Query(params): Query<TreeParams>,
) -> Result<Json<Value>> {
    let options = if params.sizes {
        TreeOptions::sized()
    } else {
        TreeOptions::default()
    };

    let (repository, tree) = state
        .insights
        .tree(&params.repo_url, &params.path, options)
        .await?;

    Ok(Json(json!({
        "repository": repository,
        "nodes": tree.nodes,
        "diagnostics": tree.diagnostics,
    })))
}

/// GET /api/search?q= - Search repositories by keyword
pub async fn search_repositories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ReposResponse>> {
    debug!("Search request: {:?}", params);

    let repositories = state.insights.search(&params.q).await?;
    Ok(Json(ReposResponse { repositories }))
}

/// POST /api/analyze - Architecture summary and sized tree
pub async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<RepoUrlRequest>,
) -> Result<Json<Analysis>> {
    Ok(Json(state.insights.analyze(&body.repo_url).await?))
}

/// POST /api/docs - Documentation for a single file
pub async fn document_file(
    State(state): State<AppState>,
    Json(body): Json<DocsRequest>,
) -> Result<Json<DocumentedFile>> {
    Ok(Json(
        state
            .insights
            .document_file(&body.repo_url, &body.path)
            .await?,
    ))
}

/// POST /api/ask - One-off question without a transcript
pub async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AnswerResponse>> {
    let answer = state
        .insights
        .answer(&body.repo_url, &body.question)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

/// POST /api/suggest - Similar repositories ranked by stars
pub async fn suggest(
    State(state): State<AppState>,
    Json(body): Json<RepoUrlRequest>,
) -> Result<Json<SuggestOutcome>> {
    Ok(Json(state.insights.suggest(&body.repo_url).await?))
}

/// POST /api/sessions - Create a session
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionSnapshot>)> {
    let handle = state.sessions.create().await;
    Ok((StatusCode::CREATED, Json(handle.snapshot().await)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.sessions.get(id).await?;
    Ok(Json(handle.snapshot().await))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(crate::Error::NotFound("Session not found.".to_string()))
    }
}

/// PUT /api/sessions/:id/username - Remember the GitHub username
pub async fn set_username(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UsernameRequest>,
) -> Result<Json<SessionSnapshot>> {
    let handle = state.sessions.get(id).await?;
    handle.set_username(body.username).await;
    Ok(Json(handle.snapshot().await))
}

/// POST /api/sessions/:id/tree - Open a repository for documentation
pub async fn open_tree(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RepoUrlRequest>,
) -> Result<Json<AppliedResponse<SessionSnapshot>>> {
    let handle = state.sessions.get(id).await?;
    let applied = handle.load_tree(&state.insights, &body.repo_url).await?;
    Ok(Json(AppliedResponse {
        applied,
        session: handle.snapshot().await,
    }))
}

/// POST /api/sessions/:id/docs - Document one file of the open tree
pub async fn document_node(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PathRequest>,
) -> Result<Json<TreeNode>> {
    let handle = state.sessions.get(id).await?;
    Ok(Json(handle.document_node(&state.insights, &body.path).await?))
}

/// POST /api/sessions/:id/chat - Start a new transcript
pub async fn start_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RepoUrlRequest>,
) -> Result<Json<ChatSession>> {
    let handle = state.sessions.get(id).await?;
    Ok(Json(handle.start_chat(&body.repo_url).await?))
}

/// DELETE /api/sessions/:id/chat - Drop the transcript
pub async fn clear_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let handle = state.sessions.get(id).await?;
    handle.clear_chat().await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/chat/messages - Ask a question
pub async fn post_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<QuestionRequest>,
) -> Result<Json<ChatSession>> {
    let handle = state.sessions.get(id).await?;
    Ok(Json(handle.ask(&state.insights, &body.question).await?))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let rate_limit = state.insights.github().rate_limit_status().await;

    Ok(Json(ReadinessResponse {
        ready: rate_limit.remaining > 0,
        github_authenticated: state.insights.github().config().is_authenticated(),
        github_rate_limit_remaining: rate_limit.remaining,
        ai_configured: state.settings.ai.is_configured(),
        sessions: state.sessions.len().await,
        tree_fetches_in_flight: state.insights.trees().in_flight(),
    }))
}
