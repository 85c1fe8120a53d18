use base64::{engine::general_purpose::STANDARD, Engine as _};
use code_insights::github::parse_repository_url;
use code_insights::Error;
use mockito::Server;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{dir_entry, insights, insights_with_model, StubModel};

const SOURCE: &str = "fn main() {\n    println!(\"héllo\");\n}\n";

fn wrapped_base64(text: &str) -> String {
    // GitHub wraps encoded content at 60 columns
    let encoded = STANDARD.encode(text);
    encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn file_mock(server: &mut mockito::ServerGuard, path: &str, text: &str) -> mockito::Mock {
    let name = path.rsplit('/').next().unwrap_or(path);
    server
        .mock("GET", format!("/repos/o/r/contents/{path}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": name,
                "path": path,
                "type": "file",
                "size": text.len(),
                "encoding": "base64",
                "content": wrapped_base64(text)
            })
            .to_string(),
        )
        .create_async()
        .await
}

#[tokio::test]
async fn test_document_file_decodes_content() {
    let mut server = Server::new_async().await;
    let _m = file_mock(&mut server, "src/main.rs", SOURCE).await;

    let model = Arc::new(StubModel::new().reply(
        "documentFile",
        json!({ "documentation": "## main.rs\nPrints a greeting." }),
    ));
    let insights = insights_with_model(&server, model.clone());

    let doc = insights
        .document_file("https://github.com/o/r", "src/main.rs")
        .await
        .unwrap();

    assert_eq!(doc.name, "main.rs");
    assert_eq!(doc.path, "src/main.rs");
    assert_eq!(doc.content, SOURCE);
    assert!(doc.documentation.starts_with("## main.rs"));

    // The model saw the decoded source, not the base64 payload
    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("println!(\"héllo\")"));
    assert!(prompts[0].contains("main.rs"));
}

#[tokio::test]
async fn test_directory_cannot_be_documented() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/repos/o/r/contents/src")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([dir_entry("src/nested")]).to_string())
        .create_async()
        .await;

    let repo = parse_repository_url("o/r").unwrap();
    let err = insights(&server, StubModel::new())
        .document_path(&repo, "src")
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Could not fetch file content.");
}

#[tokio::test]
async fn test_model_failure_is_propagated() {
    let mut server = Server::new_async().await;
    let _m = file_mock(&mut server, "lib.rs", "pub fn f() {}\n").await;

    let err = insights(&server, StubModel::new())
        .document_file("https://github.com/o/r", "lib.rs")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn test_empty_documentation_is_a_schema_violation() {
    let mut server = Server::new_async().await;
    let _m = file_mock(&mut server, "lib.rs", "pub fn f() {}\n").await;

    let model = StubModel::new().reply("documentFile", json!({ "documentation": "  " }));
    let err = insights(&server, model)
        .document_file("https://github.com/o/r", "lib.rs")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SchemaViolation(_)));
}

#[tokio::test]
async fn test_empty_file_is_not_sent_to_the_model() {
    let mut server = Server::new_async().await;
    let _m = file_mock(&mut server, "empty.rs", "").await;

    let model = Arc::new(StubModel::new().reply(
        "documentFile",
        json!({ "documentation": "Nothing here." }),
    ));
    let err = insights_with_model(&server, model.clone())
        .document_file("https://github.com/o/r", "empty.rs")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.user_message(), "Could not fetch file content.");
    assert!(model.prompts.lock().unwrap().is_empty());
}
