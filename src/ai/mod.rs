pub mod client;
pub mod config;
pub mod flows;
pub mod prompts;

pub use client::{GeminiClient, GenerationRequest, LanguageModel};
pub use config::AiConfig;
pub use flows::{
    AiFlows, ArchitectureSummary, ArchitectureSummaryInput, FileDocumentation,
    FileDocumentationInput, RepoAnswer, RepoQuestionInput, SimilarRepos, SimilarReposInput,
    SuggestedRepo,
};
