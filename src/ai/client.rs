use crate::ai::config::AiConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// One structured-output request to a language model
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Flow name, for logging
    pub flow: &'static str,
    pub prompt: String,
    /// JSON schema the reply must follow
    pub response_schema: Value,
}

/// A hosted model that answers a prompt with a JSON document
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Value>;
}

/// Google Generative Language API (`generateContent`)
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: AiConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url, self.config.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Value> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("AI_API_KEY is not set".to_string()))?;

        debug!("AI request: flow={} model={}", request.flow, self.config.model);

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("AI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
            let message = envelope
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("AI service returned {status}"));
            warn!("AI flow {} failed: {} - {}", request.flow, status, message);
            return Err(Error::Upstream(message));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse AI response: {e}")))?;

        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::SchemaViolation(format!(
                "{}: model returned no output",
                request.flow
            )));
        }

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            Error::SchemaViolation(format!("{}: output is not valid JSON: {e}", request.flow))
        })
    }
}

/// Models sometimes wrap JSON in a markdown fence despite the mime type
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
