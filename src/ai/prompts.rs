//! Prompt templates and response schemas for each flow.
//!
//! Schemas use the OpenAPI subset accepted by `responseSchema`.

use serde_json::{json, Value};

pub fn architecture_summary(repo_url: &str) -> String {
    format!(
        "You are an expert in software architecture.\n\
         Analyze the GitHub repository below and write a high-level summary of its architecture: \
         the main components, how they relate to each other, and how the project is structured overall. \
         Aim the summary at a developer who needs to find their way around the codebase quickly.\n\n\
         Repository URL: {repo_url}\n"
    )
}

pub fn architecture_summary_schema() -> Value {
    object_schema(&[("summary", "High-level architecture summary of the codebase.")])
}

pub fn file_documentation(file_name: &str, file_content: &str) -> String {
    format!(
        "You are an expert at documenting source files.\n\n\
         Write documentation for the file below. Explain its purpose and how it works, \
         quoting the relevant code snippets where they help.\n\n\
         File Name: {file_name}\n\
         File Content:\n\
         ```\n{file_content}\n```\n"
    )
}

pub fn file_documentation_schema() -> Value {
    object_schema(&[("documentation", "Documentation for the file, in Markdown.")])
}

pub fn repo_question(repo_url: &str, question: &str) -> String {
    format!(
        "You are an expert at answering questions about source code repositories.\n\
         Using what you know about the repository below, give a clear and concise answer to the question.\n\n\
         Repository URL: {repo_url}\n\
         Question: {question}\n"
    )
}

pub fn repo_question_schema() -> Value {
    object_schema(&[("answer", "Answer to the question.")])
}

pub fn similar_repositories(repo_url: &str) -> String {
    format!(
        "You are an expert on open-source software.\n\
         Suggest GitHub repositories similar to the one below. First extract keywords from the \
         repository name in the URL; for example https://github.com/user/CPU-Scheduling-Algorithms \
         gives the keywords \"CPU\", \"Scheduling\" and \"Algorithms\". Then propose 5 existing \
         repositories related to those keywords. For each one give its full name in \"owner/repo\" \
         form and a short reason for the recommendation.\n\n\
         Repository URL: {repo_url}\n"
    )
}

pub fn similar_repositories_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "keywords": {
                "type": "ARRAY",
                "description": "Keywords extracted from the repository name.",
                "items": { "type": "STRING" },
            },
            "suggestions": {
                "type": "ARRAY",
                "description": "Suggested similar repositories.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "repoName": {
                            "type": "STRING",
                            "description": "Full repository name in owner/repo form.",
                        },
                        "reason": {
                            "type": "STRING",
                            "description": "Why this repository is a good suggestion.",
                        },
                    },
                    "required": ["repoName", "reason"],
                },
            },
        },
        "required": ["keywords", "suggestions"],
    })
}

fn object_schema(fields: &[(&str, &str)]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "STRING", "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}
