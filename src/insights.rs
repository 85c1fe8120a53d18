use crate::ai::{
    AiFlows, ArchitectureSummaryInput, FileDocumentationInput, GeminiClient,
    LanguageModel, RepoQuestionInput, SimilarReposInput,
};
use crate::github::{
    parse_repository_url, Contents, GitHubClient, GitHubConfig, RepositoryRef, RepositorySummary,
};
use crate::suggest::{Suggestion, SuggestionReconciler};
use crate::tree::{TreeAggregator, TreeBuild, TreeOptions};
use crate::{Error, Result, Settings};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Architecture summary plus a size-annotated tree
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub repository: RepositoryRef,
    pub summary: String,
    pub tree: TreeBuild,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentedFile {
    pub name: String,
    pub path: String,
    pub content: String,
    pub documentation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestOutcome {
    pub keywords: Vec<String>,
    pub suggestions: Vec<Suggestion>,
    /// AI candidates that did not resolve to a GitHub repository
    pub dropped: usize,
}

/// Composes the GitHub client, tree aggregation, AI flows and reconciliation
/// into the operations each view needs.
#[derive(Clone)]
pub struct Insights {
    github: GitHubClient,
    trees: TreeAggregator,
    reconciler: SuggestionReconciler,
    flows: AiFlows,
}

impl Insights {
    pub fn new(settings: &Settings) -> Result<Self> {
        let model = GeminiClient::new(settings.ai.clone())?;
        if !settings.ai.is_configured() {
            warn!("No AI API key configured; AI flows will fail until AI_API_KEY is set");
        }
        Self::with_model(settings.github.clone(), Arc::new(model))
    }

    /// Build with an explicit model, e.g. a stub in tests
    pub fn with_model(github: GitHubConfig, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let concurrency = github.max_concurrency;
        let client = GitHubClient::new(github)?;

        Ok(Self {
            trees: TreeAggregator::new(client.clone(), concurrency),
            reconciler: SuggestionReconciler::new(client.clone(), concurrency),
            github: client,
            flows: AiFlows::new(model),
        })
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    pub fn trees(&self) -> &TreeAggregator {
        &self.trees
    }

    pub async fn user_repos(&self, username: &str) -> Result<Vec<RepositorySummary>> {
        self.github.list_user_repos(username).await
    }

    pub async fn repository(&self, repo_url: &str) -> Result<RepositorySummary> {
        let repo = parse_repository_url(repo_url)?;
        self.github.get_repository(&repo).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<RepositorySummary>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("Search query cannot be empty".to_string()));
        }
        self.github.search_repositories(query.trim()).await
    }

    pub async fn contents(&self, repo_url: &str, path: &str) -> Result<Contents> {
        let repo = parse_repository_url(repo_url)?;
        self.github.get_contents(&repo, path).await
    }

    /// Directory-first tree for the documentation view
    pub async fn file_tree(&self, repo_url: &str) -> Result<(RepositoryRef, TreeBuild)> {
        self.tree(repo_url, "", TreeOptions::default()).await
    }

    pub async fn tree(
        &self,
        repo_url: &str,
        path: &str,
        options: TreeOptions,
    ) -> Result<(RepositoryRef, TreeBuild)> {
        let repo = parse_repository_url(repo_url)?;
        let tree = self.trees.build_tree(&repo, path, options).await;
        Ok((repo, tree))
    }

    /// Summary and sized tree, fetched concurrently
    pub async fn analyze(&self, repo_url: &str) -> Result<Analysis> {
        let repo = parse_repository_url(repo_url)?;
        let input = ArchitectureSummaryInput {
            repo_url: repo_url.trim().to_string(),
        };

        let (summary, tree) = tokio::join!(
            self.flows.summarize_architecture(&input),
            self.trees.build_tree(&repo, "", TreeOptions::sized()),
        );

        info!("Analysis of {} complete", repo);
        Ok(Analysis {
            repository: repo,
            summary: summary?.summary,
            tree,
        })
    }

    /// Fetch a file and decode it to text
    pub async fn file_text(&self, repo: &RepositoryRef, path: &str) -> Result<String> {
        match self.github.get_contents(repo, path).await? {
            Contents::File(file) => file
                .decode()?
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| Error::Validation("Could not fetch file content.".to_string())),
            Contents::Directory(_) => Err(Error::Validation(
                "Could not fetch file content.".to_string(),
            )),
        }
    }

    pub async fn document_file(&self, repo_url: &str, path: &str) -> Result<DocumentedFile> {
        let repo = parse_repository_url(repo_url)?;
        self.document_path(&repo, path).await
    }

    pub async fn document_path(&self, repo: &RepositoryRef, path: &str) -> Result<DocumentedFile> {
        let path = path.trim_matches('/');
        let content = self.file_text(repo, path).await?;
        let name = path.rsplit('/').next().unwrap_or(path).to_string();

        let docs = self
            .flows
            .document_file(&FileDocumentationInput {
                file_name: name.clone(),
                file_content: content.clone(),
            })
            .await?;

        Ok(DocumentedFile {
            name,
            path: path.to_string(),
            content,
            documentation: docs.documentation,
        })
    }

    pub async fn answer(&self, repo_url: &str, question: &str) -> Result<String> {
        parse_repository_url(repo_url)?;
        let answer = self
            .flows
            .answer_question(&RepoQuestionInput {
                repo_url: repo_url.trim().to_string(),
                question: question.trim().to_string(),
            })
            .await?;
        Ok(answer.answer)
    }

    /// Ask the AI for similar repositories and keep the ones that exist
    pub async fn suggest(&self, repo_url: &str) -> Result<SuggestOutcome> {
        let similar = self
            .flows
            .suggest_similar(&SimilarReposInput {
                repo_url: repo_url.trim().to_string(),
            })
            .await?;

        if similar.suggestions.is_empty() {
            info!(
                "No suggestions for {} (keywords: {})",
                repo_url,
                similar.keywords.join(", ")
            );
        }

        let reconciled = self.reconciler.reconcile(similar.candidates()).await;

        Ok(SuggestOutcome {
            keywords: similar.keywords,
            suggestions: reconciled.suggestions,
            dropped: reconciled.dropped,
        })
    }
}
