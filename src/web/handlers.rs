use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Deserializer};
use tracing::warn;
use uuid::Uuid;

use crate::{
    api::handlers::AppState,
    error::Error,
    github::{parse_repository_url, RepositorySummary},
    session::{ChatMessage, Role, SessionHandle},
    tree::{flatten, TreeBuild},
    Result,
};

/// Shown when an AI flow fails on a page
const AI_FAILED: &str = "An error occurred while talking to the AI service. Please try again.";

/// Deserialize optional string, treating empty strings as None
fn deserialize_optional_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(s.to_string())),
    }
}

fn render<T: Template>(template: T) -> Result<Html<String>> {
    Ok(Html(template.render().map_err(|e| {
        Error::Internal(format!("Template render failed: {e}"))
    })?))
}

/// Message for a failed page action; repository errors keep their own wording
fn page_error(err: &Error) -> String {
    warn!("Page request failed: {}", err.log_safe());
    match err {
        Error::SchemaViolation(_) | Error::Config(_) => AI_FAILED.to_string(),
        other => other.user_message(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    repo_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    analyze: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    session: Option<String>,
}

#[derive(Clone)]
struct RepoRow {
    full_name: String,
    html_url: String,
    description: String,
    language: String,
    stars: u64,
    forks: u64,
    updated: String,
}

impl From<RepositorySummary> for RepoRow {
    fn from(repo: RepositorySummary) -> Self {
        Self {
            full_name: repo.full_name,
            html_url: repo.html_url,
            description: repo.description.unwrap_or_default(),
            language: repo.language.unwrap_or_default(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            updated: repo
                .updated_at
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
struct TreeRow {
    name: String,
    path: String,
    is_dir: bool,
    indent: usize,
    size: String,
    /// Share of the whole tree, for the proportional bar
    percent: u64,
}

fn tree_rows(tree: &TreeBuild) -> Vec<TreeRow> {
    let total: u64 = tree.nodes.iter().filter_map(|n| n.size).sum::<u64>().max(1);

    flatten(&tree.nodes)
        .into_iter()
        .map(|(depth, node)| TreeRow {
            name: node.name.clone(),
            path: node.path.clone(),
            is_dir: node.is_dir(),
            indent: depth,
            size: node.size.map(format_size).unwrap_or_default(),
            percent: node.size.map(|s| (s * 100) / total).unwrap_or(0),
        })
        .collect()
}

fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1_048_576 => format!("{:.1} MB", b as f64 / 1_048_576.0),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{b} B"),
    }
}

/// Landing page template
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    username: String,
}

/// GET / - Landing page with entry forms
pub async fn index(Query(params): Query<PageParams>) -> Result<impl IntoResponse> {
    render(IndexTemplate {
        username: params.username.unwrap_or_default(),
    })
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    username: String,
    repos: Vec<RepoRow>,
    error: String,
}

/// GET /dashboard?username= - A user's repositories
pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let username = params.username.unwrap_or_default();

    let (repos, error) = if username.is_empty() {
        (Vec::new(), String::new())
    } else {
        match state.insights.user_repos(&username).await {
            Ok(repos) if repos.is_empty() => (
                Vec::new(),
                "No public repositories found for this user.".to_string(),
            ),
            Ok(repos) => (repos.into_iter().map(RepoRow::from).collect(), String::new()),
            Err(e) => (Vec::new(), e.user_message()),
        }
    };

    render(DashboardTemplate {
        username,
        repos,
        error,
    })
}

#[derive(Template)]
#[template(path = "analyze.html")]
struct AnalyzeTemplate {
    repo_url: String,
    summary: String,
    rows: Vec<TreeRow>,
    failed_subtrees: usize,
    error: String,
}

/// GET /analyze?repoUrl=&analyze=true - Architecture summary and sized tree
pub async fn analyze_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let repo_url = params.repo_url.unwrap_or_default();
    let run = params.analyze.as_deref() == Some("true") && !repo_url.is_empty();

    let mut template = AnalyzeTemplate {
        repo_url,
        summary: String::new(),
        rows: Vec::new(),
        failed_subtrees: 0,
        error: String::new(),
    };

    if run {
        match state.insights.analyze(&template.repo_url).await {
            Ok(analysis) => {
                template.summary = analysis.summary;
                template.rows = tree_rows(&analysis.tree);
                template.failed_subtrees = analysis.tree.diagnostics.failed_subtrees;
            }
            Err(e) => template.error = page_error(&e),
        }
    }

    render(template)
}

#[derive(Template)]
#[template(path = "docs.html")]
struct DocsTemplate {
    repo_url: String,
    username: String,
    repository: String,
    rows: Vec<TreeRow>,
    failed_paths: Vec<String>,
    error: String,
}

/// GET /docs?repoUrl=&username= - Repository file tree
pub async fn docs_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let repo_url = params.repo_url.unwrap_or_default();

    let mut template = DocsTemplate {
        repo_url: repo_url.clone(),
        username: params.username.unwrap_or_default(),
        repository: String::new(),
        rows: Vec::new(),
        failed_paths: Vec::new(),
        error: String::new(),
    };

    if !repo_url.is_empty() {
        match state.insights.file_tree(&repo_url).await {
            Ok((repository, tree)) => {
                template.repository = repository.full_name();
                template.rows = tree_rows(&tree);
                match tree.diagnostics.root_error {
                    Some(message) => template.error = message,
                    None => template.failed_paths = tree.diagnostics.failed_paths,
                }
            }
            Err(e) => template.error = e.user_message(),
        }
    }

    render(template)
}

#[derive(Template)]
#[template(path = "file_docs.html")]
struct FileDocsTemplate {
    repo_url: String,
    path: String,
    documentation: String,
    content: String,
    error: String,
}

/// GET /docs/file?repoUrl=&path= - Documentation for one file
pub async fn file_docs_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let repo_url = params.repo_url.unwrap_or_default();
    let path = params.path.unwrap_or_default();

    let mut template = FileDocsTemplate {
        repo_url,
        path,
        documentation: String::new(),
        content: String::new(),
        error: String::new(),
    };

    if template.repo_url.is_empty() || template.path.is_empty() {
        template.error = "A repository URL and file path are required.".to_string();
    } else {
        match state
            .insights
            .document_file(&template.repo_url, &template.path)
            .await
        {
            Ok(doc) => {
                template.documentation = doc.documentation;
                template.content = doc.content;
            }
            Err(e) => template.error = page_error(&e),
        }
    }

    render(template)
}

#[derive(Clone)]
struct SuggestionCard {
    full_name: String,
    html_url: String,
    description: String,
    stars: u64,
    forks: u64,
    reason: String,
}

#[derive(Template)]
#[template(path = "suggest.html")]
struct SuggestTemplate {
    repo_url: String,
    cards: Vec<SuggestionCard>,
    keywords: String,
    searched: bool,
    error: String,
}

/// GET /suggest?repoUrl= - Similar repositories
pub async fn suggest_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let repo_url = params.repo_url.unwrap_or_default();

    let mut template = SuggestTemplate {
        repo_url,
        cards: Vec::new(),
        keywords: String::new(),
        searched: false,
        error: String::new(),
    };

    if !template.repo_url.is_empty() {
        template.searched = true;
        match state.insights.suggest(&template.repo_url).await {
            Ok(outcome) => {
                template.keywords = outcome.keywords.join(", ");
                template.cards = outcome
                    .suggestions
                    .into_iter()
                    .map(|s| SuggestionCard {
                        full_name: s.details.full_name,
                        html_url: s.details.html_url,
                        description: s.details.description.unwrap_or_default(),
                        stars: s.details.stargazers_count,
                        forks: s.details.forks_count,
                        reason: s.reason,
                    })
                    .collect();
            }
            Err(e) => template.error = page_error(&e),
        }
    }

    render(template)
}

#[derive(Clone)]
struct MessageRow {
    from_user: bool,
    text: String,
}

impl From<&ChatMessage> for MessageRow {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            from_user: msg.role == Role::User,
            text: msg.text.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "qa.html")]
struct QaTemplate {
    repo_url: String,
    session: String,
    messages: Vec<MessageRow>,
    error: String,
}

/// GET /qa?repoUrl=&session= - Chat transcript
pub async fn qa_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse> {
    let repo_url = params.repo_url.unwrap_or_default();
    let mut messages = Vec::new();
    let mut session = String::new();

    if let Some(Ok(id)) = params.session.as_deref().map(Uuid::parse_str) {
        if let Ok(handle) = state.sessions.get(id).await {
            if let Some(chat) = handle.snapshot().await.chat {
                // Navigating to another repository starts over
                if chat.repo_url == repo_url {
                    messages = chat.messages().iter().map(MessageRow::from).collect();
                    session = id.to_string();
                }
            }
        }
    }

    render(QaTemplate {
        repo_url,
        session,
        messages,
        error: String::new(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaForm {
    repo_url: String,
    question: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    session: Option<String>,
}

/// POST /qa - Ask a question, then show the transcript
pub async fn qa_ask(State(state): State<AppState>, Form(form): Form<QaForm>) -> Result<Response> {
    let repo_url = form.repo_url.trim().to_string();
    let existing = match form.session.as_deref().map(Uuid::parse_str) {
        Some(Ok(id)) => state.sessions.get(id).await.ok(),
        _ => None,
    };

    // Reject the form before a session is created for it
    let checked = if form.question.trim().is_empty() {
        Err(Error::Validation("Question cannot be empty.".to_string()))
    } else {
        parse_repository_url(&repo_url).map(|_| ())
    };
    if let Err(e) = checked {
        return qa_error_page(existing.as_deref(), repo_url, &e).await;
    }

    let handle = match existing {
        Some(handle) => handle,
        None => state.sessions.create().await,
    };

    let same_repo = handle
        .snapshot()
        .await
        .chat
        .is_some_and(|chat| chat.repo_url == repo_url);
    if !same_repo {
        if let Err(e) = handle.start_chat(&repo_url).await {
            return qa_error_page(Some(&*handle), repo_url, &e).await;
        }
    }

    if let Err(e) = handle.ask(&state.insights, &form.question).await {
        return qa_error_page(Some(&*handle), repo_url, &e).await;
    }

    Ok(Redirect::to(&format!(
        "/qa?repoUrl={}&session={}",
        urlencoding::encode(&repo_url),
        handle.id()
    ))
    .into_response())
}

/// Re-render the transcript for `repo_url` with an error above it
async fn qa_error_page(
    handle: Option<&SessionHandle>,
    repo_url: String,
    err: &Error,
) -> Result<Response> {
    let mut template = QaTemplate {
        repo_url,
        session: String::new(),
        messages: Vec::new(),
        error: page_error(err),
    };

    if let Some(handle) = handle {
        if let Some(chat) = handle.snapshot().await.chat {
            if chat.repo_url == template.repo_url {
                template.messages = chat.messages().iter().map(MessageRow::from).collect();
                template.session = handle.id().to_string();
            }
        }
    }

    Ok(render(template)?.into_response())
}
