//! Per-visitor state held by the server.
//!
//! Replaces browser-side globals with an explicit session: the remembered
//! username, the documentation tree for the current repository, and the
//! question-answering transcript. Each top-level query issues a
//! [`RequestToken`]; results that arrive for a superseded token are dropped.

pub mod chat;
pub mod tokens;

pub use chat::{ChatMessage, ChatSession, Role, ANSWER_FAILED};
pub use tokens::{RequestToken, RequestTokens};

use crate::github::{parse_repository_url, RepositoryRef};
use crate::insights::Insights;
use crate::tree::{find_node, find_node_mut, update_node, TreeBuild, TreeNode};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Documentation tree for the repository currently open in a session
#[derive(Debug, Clone)]
struct DocsView {
    repository: RepositoryRef,
    tree: TreeBuild,
    token: RequestToken,
}

#[derive(Debug, Clone)]
struct ChatView {
    chat: ChatSession,
    token: RequestToken,
}

#[derive(Debug)]
struct SessionState {
    username: Option<String>,
    docs: Option<DocsView>,
    chat: Option<ChatView>,
    last_seen: DateTime<Utc>,
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub username: Option<String>,
    pub repository: Option<RepositoryRef>,
    pub tree: Option<TreeBuild>,
    pub chat: Option<ChatSession>,
}

pub struct SessionHandle {
    id: Uuid,
    tree_tokens: RequestTokens,
    chat_tokens: RequestTokens,
    state: Mutex<SessionState>,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tree_tokens: RequestTokens::new(),
            chat_tokens: RequestTokens::new(),
            state: Mutex::new(SessionState {
                username: None,
                docs: None,
                chat: None,
                last_seen: Utc::now(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.last_seen = Utc::now();
        SessionSnapshot {
            id: self.id,
            username: state.username.clone(),
            repository: state.docs.as_ref().map(|d| d.repository.clone()),
            tree: state.docs.as_ref().map(|d| d.tree.clone()),
            chat: state.chat.as_ref().map(|c| c.chat.clone()),
        }
    }

    pub async fn username(&self) -> Option<String> {
        self.state.lock().await.username.clone()
    }

    /// Remember (or forget, with `None`) the username used for repository listings
    pub async fn set_username(&self, username: Option<String>) {
        let username = username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let mut state = self.state.lock().await;
        state.username = username;
        state.last_seen = Utc::now();
    }

    /// Open a repository for documentation, replacing any previous tree.
    ///
    /// Returns false when a newer query superseded this one before it finished.
    pub async fn load_tree(&self, insights: &Insights, repo_url: &str) -> Result<bool> {
        let token = self.tree_tokens.issue();
        {
            let mut state = self.state.lock().await;
            state.docs = None;
            state.last_seen = Utc::now();
        }

        let (repository, tree) = insights.file_tree(repo_url).await?;

        let mut state = self.state.lock().await;
        if !self.tree_tokens.is_latest(token) {
            debug!(
                "Discarding tree for {} (token {} superseded)",
                repository,
                token.value()
            );
            return Ok(false);
        }

        info!("Session {} opened {}", self.id, repository);
        state.docs = Some(DocsView {
            repository,
            tree,
            token,
        });
        Ok(true)
    }

    /// Generate documentation for one file of the open tree, storing it on the node
    pub async fn document_node(&self, insights: &Insights, path: &str) -> Result<TreeNode> {
        let path = path.trim_matches('/');

        let (repository, token) = {
            let mut state = self.state.lock().await;
            let view = state.docs.as_mut().ok_or_else(|| {
                Error::Validation("No repository is open in this session.".to_string())
            })?;
            let node = find_node_mut(&mut view.tree.nodes, path)
                .ok_or_else(|| Error::NotFound(format!("{path} is not in the tree.")))?;

            if node.is_dir() {
                return Err(Error::Validation(
                    "Documentation is generated per file.".to_string(),
                ));
            }
            if node.documentation.is_some() || node.is_generating {
                return Ok(node.clone());
            }

            node.is_generating = true;
            (view.repository.clone(), view.token)
        };

        let result = insights.document_path(&repository, path).await;

        let mut state = self.state.lock().await;
        let view = match state.docs.as_mut() {
            Some(view) if view.token == token => view,
            _ => {
                return Err(Error::Validation(
                    "The repository changed while documentation was being generated.".to_string(),
                ))
            }
        };

        update_node(&mut view.tree.nodes, path, |node| {
            node.is_generating = false;
            if let Ok(doc) = &result {
                node.documentation = Some(doc.documentation.clone());
            }
        });
        result?;

        find_node(&view.tree.nodes, path)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("{path} vanished from the tree")))
    }

    /// Start a new transcript about `repo_url`, dropping the previous one
    pub async fn start_chat(&self, repo_url: &str) -> Result<ChatSession> {
        parse_repository_url(repo_url)?;
        let token = self.chat_tokens.issue();
        let chat = ChatSession::new(repo_url.trim());

        let mut state = self.state.lock().await;
        state.chat = Some(ChatView {
            chat: chat.clone(),
            token,
        });
        state.last_seen = Utc::now();
        Ok(chat)
    }

    pub async fn clear_chat(&self) {
        self.chat_tokens.issue();
        self.state.lock().await.chat = None;
    }

    /// Ask a question in the current transcript.
    ///
    /// A failed answer is recorded as an apology message rather than returned as an error.
    pub async fn ask(&self, insights: &Insights, question: &str) -> Result<ChatSession> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Validation("Question cannot be empty.".to_string()));
        }

        let (repo_url, token) = {
            let mut state = self.state.lock().await;
            let view = state.chat.as_mut().ok_or_else(|| {
                Error::Validation("No chat has been started in this session.".to_string())
            })?;
            view.chat.push_user(question);
            (view.chat.repo_url.clone(), view.token)
        };

        let reply = match insights.answer(&repo_url, question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Answer flow failed: {}", e.log_safe());
                ANSWER_FAILED.to_string()
            }
        };

        let mut state = self.state.lock().await;
        match state.chat.as_mut() {
            Some(view) if view.token == token && self.chat_tokens.is_latest(token) => {
                view.chat.push_assistant(reply);
                Ok(view.chat.clone())
            }
            _ => Err(Error::Validation(
                "The chat was reset while the answer was being generated.".to_string(),
            )),
        }
    }
}

/// In-memory sessions keyed by id
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
    max_idle: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

impl SessionStore {
    pub fn new(max_idle: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_idle,
        }
    }

    pub async fn create(&self) -> Arc<SessionHandle> {
        self.prune_idle().await;

        let handle = Arc::new(SessionHandle::new());
        self.sessions
            .write()
            .await
            .insert(handle.id(), handle.clone());
        debug!("Created session {}", handle.id());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Session not found.".to_string()))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions untouched for longer than `max_idle`; busy sessions are kept
    async fn prune_idle(&self) {
        let cutoff = Utc::now() - self.max_idle;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.state.try_lock() {
            Ok(state) => state.last_seen >= cutoff,
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let store = SessionStore::default();
        let handle = store.create().await;

        let fetched = store.get(handle.id()).await.unwrap();
        assert_eq!(fetched.id(), handle.id());
        assert_eq!(store.len().await, 1);

        assert!(store.remove(handle.id()).await);
        assert!(matches!(
            store.get(handle.id()).await,
            Err(Error::NotFound(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_pruned() {
        let store = SessionStore::new(Duration::zero());
        let old = store.create().await;
        old.state.lock().await.last_seen = Utc::now() - Duration::minutes(5);

        let fresh = store.create().await;
        assert!(store.get(old.id()).await.is_err());
        assert!(store.get(fresh.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_username_is_trimmed_and_cleared() {
        let store = SessionStore::default();
        let handle = store.create().await;

        handle.set_username(Some("  octocat ".to_string())).await;
        assert_eq!(handle.username().await.as_deref(), Some("octocat"));

        handle.set_username(Some("   ".to_string())).await;
        assert_eq!(handle.username().await, None);
    }

    #[tokio::test]
    async fn test_start_chat_rejects_bad_url() {
        let handle = SessionStore::default().create().await;
        assert!(handle.start_chat("not-a-repo").await.is_err());

        let chat = handle.start_chat("https://github.com/a/b").await.unwrap();
        assert!(chat.is_empty());

        handle.clear_chat().await;
        assert!(handle.snapshot().await.chat.is_none());
    }
}
