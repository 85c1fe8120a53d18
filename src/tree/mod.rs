//! Recursive repository tree aggregation over the GitHub contents API.
//!
//! Sibling directories are fetched concurrently; the number of in-flight
//! requests is capped by a semaphore shared across the whole walk. A failed
//! fetch turns its subtree into an empty listing and is recorded in
//! [`FetchDiagnostics`] instead of failing the build.

use crate::github::{Contents, ContentEntry, ContentKind, GitHubClient, RepositoryRef};
use crate::{Error, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Size assigned to empty files and directories so they stay visible in proportional views
pub const SIZE_PLACEHOLDER: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

impl From<ContentKind> for NodeKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Dir => NodeKind::Dir,
            _ => NodeKind::File,
        }
    }
}

/// One file or directory in an aggregated repository tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Always `Some` for directories, always `None` for files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub is_generating: bool,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File,
            size: None,
            children: None,
            documentation: None,
            is_generating: false,
        }
    }

    pub fn dir(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Dir,
            size: None,
            children: Some(children),
            documentation: None,
            is_generating: false,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Ordering applied to every level of the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeOrder {
    /// Directories before files, then by name
    #[default]
    DirectoriesFirst,
    /// Keep the order the API returned
    Upstream,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    pub order: TreeOrder,
    /// Annotate every node with a positive size
    pub with_sizes: bool,
}

impl TreeOptions {
    /// Options for the proportional size view
    pub fn sized() -> Self {
        Self {
            order: TreeOrder::Upstream,
            with_sizes: true,
        }
    }
}

/// Subtrees that could not be fetched during a build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchDiagnostics {
    pub failed_subtrees: usize,
    pub failed_paths: Vec<String>,
    /// User-facing message when the requested path itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_error: Option<String>,
}

impl FetchDiagnostics {
    fn record(&mut self, path: &str) {
        self.failed_subtrees += 1;
        self.failed_paths.push(path.to_string());
    }

    fn merge(&mut self, other: FetchDiagnostics) {
        self.failed_subtrees += other.failed_subtrees;
        self.failed_paths.extend(other.failed_paths);
    }

    pub fn is_clean(&self) -> bool {
        self.failed_subtrees == 0
    }
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeBuild {
    pub nodes: Vec<TreeNode>,
    pub diagnostics: FetchDiagnostics,
}

/// Walks a repository via the contents API
#[derive(Clone)]
pub struct TreeAggregator {
    client: GitHubClient,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl TreeAggregator {
    pub fn new(client: GitHubClient, max_concurrency: usize) -> Self {
        let limit = max_concurrency.max(1);
        Self {
            client,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Number of contents requests currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Build the tree rooted at `path` (empty for the repository root)
    pub async fn build_tree(
        &self,
        repo: &RepositoryRef,
        path: &str,
        options: TreeOptions,
    ) -> TreeBuild {
        info!("Building tree for {} at '{}'", repo, path);

        let root = path.trim_matches('/').to_string();
        let (nodes, diagnostics) = match self.fetch_listing(repo, &root).await {
            Ok(entries) => self.expand(repo, entries, options).await,
            Err(e) => {
                warn!("Failed to fetch {} at '{}': {}", repo, root, e.log_safe());
                let mut diagnostics = FetchDiagnostics::default();
                diagnostics.record(&root);
                diagnostics.root_error = Some(e.user_message());
                (Vec::new(), diagnostics)
            }
        };

        if !diagnostics.is_clean() {
            warn!(
                "Tree for {} built with {} failed subtrees",
                repo, diagnostics.failed_subtrees
            );
        }
        debug!("Tree for {} has {} files", repo, count_files(&nodes));

        TreeBuild { nodes, diagnostics }
    }

    /// Fetch one directory level, holding a permit only for the request itself
    async fn fetch_listing(&self, repo: &RepositoryRef, path: &str) -> Result<Vec<ContentEntry>> {
        let contents = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| Error::Internal("Tree fetch semaphore closed".to_string()))?;
            self.client.get_contents(repo, path).await?
        };

        match contents {
            Contents::Directory(entries) => Ok(entries),
            Contents::File(file) => {
                debug!("'{}' is a file, not a directory", file.path);
                Ok(Vec::new())
            }
        }
    }

    fn walk<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        path: String,
        options: TreeOptions,
    ) -> BoxFuture<'a, (Vec<TreeNode>, FetchDiagnostics)> {
        async move {
            match self.fetch_listing(repo, &path).await {
                Ok(entries) => self.expand(repo, entries, options).await,
                Err(e) => {
                    warn!("Failed to fetch subtree '{}': {}", path, e.log_safe());
                    let mut diagnostics = FetchDiagnostics::default();
                    diagnostics.record(&path);
                    (Vec::new(), diagnostics)
                }
            }
        }
        .boxed()
    }

    /// Turn a listing into nodes, recursing into directories concurrently
    async fn expand(
        &self,
        repo: &RepositoryRef,
        entries: Vec<ContentEntry>,
        options: TreeOptions,
    ) -> (Vec<TreeNode>, FetchDiagnostics) {
        let pending = entries.into_iter().map(|entry| async move {
            match NodeKind::from(entry.kind) {
                NodeKind::Dir => {
                    let (children, diagnostics) =
                        self.walk(repo, entry.path.clone(), options).await;
                    let mut node = TreeNode::dir(entry.name, entry.path, children);
                    if options.with_sizes {
                        let total: u64 = node.children().iter().filter_map(|c| c.size).sum();
                        node.size = Some(total.max(SIZE_PLACEHOLDER));
                    }
                    (node, diagnostics)
                }
                NodeKind::File => {
                    let mut node = TreeNode::file(entry.name, entry.path);
                    if options.with_sizes {
                        node.size = Some(entry.size.max(SIZE_PLACEHOLDER));
                    }
                    (node, FetchDiagnostics::default())
                }
            }
        });

        let mut diagnostics = FetchDiagnostics::default();
        let mut nodes = Vec::new();
        for (node, sub) in join_all(pending).await {
            diagnostics.merge(sub);
            nodes.push(node);
        }

        if options.order == TreeOrder::DirectoriesFirst {
            sort_level(&mut nodes);
        }

        (nodes, diagnostics)
    }
}

fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.kind, b.kind) {
        (NodeKind::Dir, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Dir) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

/// Sort one level: directories first, then by name
pub fn sort_level(nodes: &mut [TreeNode]) {
    nodes.sort_by(compare_nodes);
}

/// Find the node addressed by `path`
pub fn find_node<'a>(nodes: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), path) {
            return Some(found);
        }
    }
    None
}

pub fn find_node_mut<'a>(nodes: &'a mut [TreeNode], path: &str) -> Option<&'a mut TreeNode> {
    for node in nodes.iter_mut() {
        if node.path == path {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_node_mut(children, path) {
                return Some(found);
            }
        }
    }
    None
}

/// Mutate the node addressed by `path` in place. Returns false if no node matched.
pub fn update_node<F>(nodes: &mut [TreeNode], path: &str, update: F) -> bool
where
    F: FnOnce(&mut TreeNode),
{
    match find_node_mut(nodes, path) {
        Some(node) => {
            update(node);
            true
        }
        None => false,
    }
}

pub fn count_files(nodes: &[TreeNode]) -> usize {
    nodes
        .iter()
        .map(|n| match n.kind {
            NodeKind::File => 1,
            NodeKind::Dir => count_files(n.children()),
        })
        .sum()
}

/// Depth-first listing of every node with its depth, for indented rendering
pub fn flatten(nodes: &[TreeNode]) -> Vec<(usize, &TreeNode)> {
    fn visit<'a>(nodes: &'a [TreeNode], depth: usize, out: &mut Vec<(usize, &'a TreeNode)>) {
        for node in nodes {
            out.push((depth, node));
            visit(node.children(), depth + 1, out);
        }
    }

    let mut out = Vec::new();
    visit(nodes, 0, &mut out);
    out
}
