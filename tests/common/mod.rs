#![allow(dead_code)]

use async_trait::async_trait;
use code_insights::ai::{GenerationRequest, LanguageModel};
use code_insights::github::GitHubConfig;
use code_insights::{Error, Insights, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

/// Model that answers each flow with a canned document and records prompts
#[derive(Default)]
pub struct StubModel {
    replies: HashMap<&'static str, Value>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, flow: &'static str, value: Value) -> Self {
        self.replies.insert(flow, value);
        self
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, request: GenerationRequest) -> Result<Value> {
        self.prompts.lock().unwrap().push(request.prompt);
        self.replies
            .get(request.flow)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("no canned reply for {}", request.flow)))
    }
}

/// Model that holds each reply until released, announcing every call it receives
pub struct GatedModel {
    reply: Value,
    started: mpsc::UnboundedSender<&'static str>,
    release: Notify,
}

impl GatedModel {
    pub fn new(reply: Value) -> (Arc<Self>, mpsc::UnboundedReceiver<&'static str>) {
        let (started, calls) = mpsc::unbounded_channel();
        let model = Arc::new(Self {
            reply,
            started,
            release: Notify::new(),
        });
        (model, calls)
    }

    /// Let one held call return
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl LanguageModel for GatedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<Value> {
        let _ = self.started.send(request.flow);
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

pub fn insights(server: &mockito::ServerGuard, model: StubModel) -> Insights {
    Insights::with_model(GitHubConfig::with_base_url(server.url()), Arc::new(model)).unwrap()
}

pub fn insights_with_model(
    server: &mockito::ServerGuard,
    model: Arc<dyn LanguageModel>,
) -> Insights {
    Insights::with_model(GitHubConfig::with_base_url(server.url()), model).unwrap()
}

pub fn repo_json(full_name: &str, stars: u64) -> Value {
    let name = full_name.rsplit('/').next().unwrap_or(full_name);
    json!({
        "id": stars + 1,
        "name": name,
        "full_name": full_name,
        "description": format!("{name} description"),
        "html_url": format!("https://github.com/{full_name}"),
        "stargazers_count": stars,
        "forks_count": 3,
        "language": "Rust",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

pub fn file_entry(path: &str, size: u64) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({ "name": name, "path": path, "type": "file", "size": size, "sha": "abc" })
}

pub fn dir_entry(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({ "name": name, "path": path, "type": "dir", "size": 0, "sha": "def" })
}
