use crate::ai::client::{GenerationRequest, LanguageModel};
use crate::ai::prompts;
use crate::suggest::SuggestionCandidate;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Checked on both sides of every flow call
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::SchemaViolation(format!("'{field}' must not be empty")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureSummaryInput {
    pub repo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDocumentationInput {
    pub file_name: String,
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDocumentation {
    pub documentation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoQuestionInput {
    pub repo_url: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoAnswer {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarReposInput {
    pub repo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedRepo {
    #[serde(alias = "fullName", alias = "full_name", alias = "repo_name")]
    pub repo_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarRepos {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub suggestions: Vec<SuggestedRepo>,
}

impl SimilarRepos {
    pub fn candidates(&self) -> Vec<SuggestionCandidate> {
        self.suggestions
            .iter()
            .map(|s| SuggestionCandidate {
                repo_name: s.repo_name.trim().to_string(),
                reason: s.reason.clone(),
            })
            .collect()
    }
}

impl Validate for ArchitectureSummaryInput {
    fn validate(&self) -> Result<()> {
        require_text("repoUrl", &self.repo_url)
    }
}

impl Validate for ArchitectureSummary {
    fn validate(&self) -> Result<()> {
        require_text("summary", &self.summary)
    }
}

impl Validate for FileDocumentationInput {
    fn validate(&self) -> Result<()> {
        require_text("fileName", &self.file_name)?;
        require_text("fileContent", &self.file_content)
    }
}

impl Validate for FileDocumentation {
    fn validate(&self) -> Result<()> {
        require_text("documentation", &self.documentation)
    }
}

impl Validate for RepoQuestionInput {
    fn validate(&self) -> Result<()> {
        require_text("repoUrl", &self.repo_url)?;
        require_text("question", &self.question)
    }
}

impl Validate for RepoAnswer {
    fn validate(&self) -> Result<()> {
        require_text("answer", &self.answer)
    }
}

impl Validate for SimilarReposInput {
    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(self.repo_url.trim())
            .map_err(|e| Error::SchemaViolation(format!("'repoUrl' is not a valid URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(Error::SchemaViolation(format!(
                "'repoUrl' must use http or https, got {scheme}"
            ))),
        }
    }
}

impl Validate for SimilarRepos {
    fn validate(&self) -> Result<()> {
        for suggestion in &self.suggestions {
            require_text("suggestions.repoName", &suggestion.repo_name)?;
            require_text("suggestions.reason", &suggestion.reason)?;
        }
        Ok(())
    }
}

/// The four schema-validated flows against a hosted model.
///
/// A schema violation on either side fails the call; nothing is retried.
#[derive(Clone)]
pub struct AiFlows {
    model: Arc<dyn LanguageModel>,
}

impl AiFlows {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    async fn run<I, O>(
        &self,
        flow: &'static str,
        input: &I,
        prompt: String,
        response_schema: serde_json::Value,
    ) -> Result<O>
    where
        I: Validate,
        O: Validate + DeserializeOwned,
    {
        input.validate()?;

        let value = self
            .model
            .generate(GenerationRequest {
                flow,
                prompt,
                response_schema,
            })
            .await?;

        let output: O = serde_json::from_value(value).map_err(|e| {
            warn!("Flow {} returned malformed output: {}", flow, e);
            Error::SchemaViolation(format!("{flow}: {e}"))
        })?;
        output.validate()?;

        info!("Flow {} completed", flow);
        Ok(output)
    }

    pub async fn summarize_architecture(
        &self,
        input: &ArchitectureSummaryInput,
    ) -> Result<ArchitectureSummary> {
        self.run(
            "summarizeArchitecture",
            input,
            prompts::architecture_summary(&input.repo_url),
            prompts::architecture_summary_schema(),
        )
        .await
    }

    pub async fn document_file(&self, input: &FileDocumentationInput) -> Result<FileDocumentation> {
        self.run(
            "documentFile",
            input,
            prompts::file_documentation(&input.file_name, &input.file_content),
            prompts::file_documentation_schema(),
        )
        .await
    }

    pub async fn answer_question(&self, input: &RepoQuestionInput) -> Result<RepoAnswer> {
        self.run(
            "answerQuestion",
            input,
            prompts::repo_question(&input.repo_url, &input.question),
            prompts::repo_question_schema(),
        )
        .await
    }

    pub async fn suggest_similar(&self, input: &SimilarReposInput) -> Result<SimilarRepos> {
        self.run(
            "suggestSimilar",
            input,
            prompts::similar_repositories(&input.repo_url),
            prompts::similar_repositories_schema(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Replies with a fixed document and remembers the last prompt
    struct CannedModel {
        reply: Value,
        last_prompt: Mutex<Option<String>>,
    }

    impl CannedModel {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply,
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(&self, request: GenerationRequest) -> Result<Value> {
            *self.last_prompt.lock().unwrap() = Some(request.prompt);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_summarize_architecture() {
        let model = CannedModel::new(json!({ "summary": "A layered web app." }));
        let flows = AiFlows::new(model.clone());

        let out = flows
            .summarize_architecture(&ArchitectureSummaryInput {
                repo_url: "https://github.com/a/b".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(out.summary, "A layered web app.");
        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("https://github.com/a/b"));
    }

    #[tokio::test]
    async fn test_output_missing_field_is_schema_violation() {
        let flows = AiFlows::new(CannedModel::new(json!({ "text": "wrong field" })));
        let result = flows
            .answer_question(&RepoQuestionInput {
                repo_url: "https://github.com/a/b".to_string(),
                question: "What is this?".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
    }

    #[tokio::test]
    async fn test_blank_output_is_schema_violation() {
        let flows = AiFlows::new(CannedModel::new(json!({ "documentation": "  " })));
        let result = flows
            .document_file(&FileDocumentationInput {
                file_name: "a.rs".to_string(),
                file_content: "fn a() {}".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_model() {
        let model = CannedModel::new(json!({ "suggestions": [] }));
        let flows = AiFlows::new(model.clone());

        let result = flows
            .suggest_similar(&SimilarReposInput {
                repo_url: "not a url".to_string(),
            })
            .await;

        assert!(matches!(result, Err(Error::SchemaViolation(_))));
        assert!(model.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_suggest_similar_accepts_full_name_alias() {
        let flows = AiFlows::new(CannedModel::new(json!({
            "keywords": ["cpu", "scheduling"],
            "suggestions": [
                { "fullName": "owner/sched", "reason": "Same algorithms" },
                { "repoName": " other/os ", "reason": "Teaching OS" },
            ],
        })));

        let out = flows
            .suggest_similar(&SimilarReposInput {
                repo_url: "https://github.com/user/CPU-Scheduling".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(out.keywords, vec!["cpu", "scheduling"]);
        let candidates = out.candidates();
        assert_eq!(candidates[0].repo_name, "owner/sched");
        assert_eq!(candidates[1].repo_name, "other/os");
    }
}
