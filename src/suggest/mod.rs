use crate::github::{parse_repository_url, GitHubClient, RepositorySummary};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A repository name proposed by the AI, not yet checked against GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    pub repo_name: String,
    pub reason: String,
}

/// A suggestion whose repository exists on GitHub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub repo_name: String,
    pub reason: String,
    pub details: RepositorySummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciled {
    /// Sorted by star count, most starred first
    pub suggestions: Vec<Suggestion>,
    /// Candidates whose lookup failed
    pub dropped: usize,
}

/// Validates AI-proposed repositories against live GitHub metadata
#[derive(Clone)]
pub struct SuggestionReconciler {
    client: GitHubClient,
    concurrency: usize,
}

impl SuggestionReconciler {
    pub fn new(client: GitHubClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn reconcile(&self, candidates: Vec<SuggestionCandidate>) -> Reconciled {
        let total = candidates.len();

        let looked_up: Vec<(usize, SuggestionCandidate, Option<RepositorySummary>)> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(index, candidate)| async move {
                    let details = self.lookup(&candidate.repo_name).await;
                    (index, candidate, details)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut resolved: Vec<(usize, Suggestion)> = looked_up
            .into_iter()
            .filter_map(|(index, candidate, details)| {
                details.map(|details| {
                    (
                        index,
                        Suggestion {
                            repo_name: candidate.repo_name,
                            reason: candidate.reason,
                            details,
                        },
                    )
                })
            })
            .collect();

        // Completion order is arbitrary; restore input order so ties stay stable
        resolved.sort_by_key(|(index, _)| *index);
        let mut suggestions: Vec<Suggestion> = resolved.into_iter().map(|(_, s)| s).collect();
        rank_by_stars(&mut suggestions);

        let dropped = total - suggestions.len();
        info!(
            "Reconciled {} suggestions: {} kept, {} dropped",
            total,
            suggestions.len(),
            dropped
        );

        Reconciled {
            suggestions,
            dropped,
        }
    }

    async fn lookup(&self, repo_name: &str) -> Option<RepositorySummary> {
        let repo = match parse_repository_url(repo_name) {
            Ok(repo) => repo,
            Err(e) => {
                debug!("Dropping suggestion '{}': {}", repo_name, e);
                return None;
            }
        };

        match self.client.get_repository(&repo).await {
            Ok(details) => Some(details),
            Err(e) => {
                debug!("Dropping suggestion '{}': {}", repo_name, e.log_safe());
                None
            }
        }
    }
}

/// Stable sort, most starred first
pub fn rank_by_stars(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| b.details.stargazers_count.cmp(&a.details.stargazers_count));
}
