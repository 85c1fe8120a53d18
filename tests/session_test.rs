use code_insights::session::{Role, SessionStore, ANSWER_FAILED};
use code_insights::Error;
use mockito::Server;
use serde_json::json;
use std::sync::{Arc, Condvar, Mutex};
use tokio::sync::mpsc;

mod common;
use common::{dir_entry, file_entry, insights, insights_with_model, GatedModel, StubModel};

async fn root_listing(
    server: &mut mockito::ServerGuard,
    repo: &str,
    entries: serde_json::Value,
) -> mockito::Mock {
    server
        .mock("GET", format!("/repos/{repo}/contents/").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(entries.to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn test_open_tree_then_document_node() {
    let mut server = Server::new_async().await;
    let _root = server
        .mock("GET", "/repos/o/r/contents/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([dir_entry("src"), file_entry("README.md", 5)]).to_string())
        .create_async()
        .await;
    let _src = server
        .mock("GET", "/repos/o/r/contents/src")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([file_entry("src/lib.rs", 14)]).to_string())
        .create_async()
        .await;
    let file = server
        .mock("GET", "/repos/o/r/contents/src/lib.rs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": "lib.rs",
                "path": "src/lib.rs",
                "type": "file",
                "size": 14,
                "encoding": "base64",
                "content": "cHViIGZuIGYoKSB7fQo="
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let model = StubModel::new().reply("documentFile", json!({ "documentation": "Defines f." }));
    let insights = insights(&server, model);
    let store = SessionStore::default();
    let session = store.create().await;

    assert!(session
        .load_tree(&insights, "https://github.com/o/r")
        .await
        .unwrap());

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.repository.unwrap().full_name(), "o/r");
    assert_eq!(snapshot.tree.unwrap().nodes.len(), 2);

    let node = session.document_node(&insights, "src/lib.rs").await.unwrap();
    assert_eq!(node.documentation.as_deref(), Some("Defines f."));
    assert!(!node.is_generating);

    // Already documented nodes are served from the session
    let again = session.document_node(&insights, "src/lib.rs").await.unwrap();
    assert_eq!(again.documentation.as_deref(), Some("Defines f."));
    file.assert_async().await;

    let err = session.document_node(&insights, "src").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_document_without_open_tree() {
    let server = Server::new_async().await;
    let insights = insights(&server, StubModel::new());
    let session = SessionStore::default().create().await;

    let err = session.document_node(&insights, "a.rs").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_chat_records_answers_and_failures() {
    let server = Server::new_async().await;
    let model = StubModel::new().reply("answerQuestion", json!({ "answer": "It uses axum." }));
    let insights = insights(&server, model);
    let session = SessionStore::default().create().await;

    session.start_chat("https://github.com/o/r").await.unwrap();
    let chat = session.ask(&insights, "What web framework?").await.unwrap();

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].text, "It uses axum.");

    // A model without an answer flow yields the apology message
    let broken = SessionStore::default().create().await;
    let no_answers = common::insights(&server, StubModel::new());
    broken.start_chat("https://github.com/o/r").await.unwrap();
    let chat = broken.ask(&no_answers, "Anything?").await.unwrap();
    assert_eq!(chat.messages()[1].role, Role::Assistant);
    assert_eq!(chat.messages()[1].text, ANSWER_FAILED);
}

#[tokio::test]
async fn test_blank_question_and_missing_chat() {
    let server = Server::new_async().await;
    let insights = insights(&server, StubModel::new());
    let session = SessionStore::default().create().await;

    let err = session.ask(&insights, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    session.start_chat("https://github.com/o/r").await.unwrap();
    let err = session.ask(&insights, "   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_store_lookup_and_removal() {
    let store = SessionStore::default();
    let session = store.create().await;
    session.set_username(Some("  octocat ".to_string())).await;

    let found = store.get(session.id()).await.unwrap();
    assert_eq!(found.username().await.as_deref(), Some("octocat"));

    assert!(store.remove(session.id()).await);
    assert!(matches!(
        store.get(session.id()).await,
        Err(Error::NotFound(_))
    ));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_superseded_tree_load_is_discarded() {
    let mut server = Server::new_async().await;
    let (arrived_tx, mut arrived) = mpsc::unbounded_channel();
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let held = gate.clone();
    let _slow = server
        .mock("GET", "/repos/o/a/contents/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let _ = arrived_tx.send(());
            let (open, opened) = &*held;
            let mut open = open.lock().unwrap();
            while !*open {
                open = opened.wait(open).unwrap();
            }
            json!([file_entry("a.rs", 1)]).to_string().into_bytes()
        })
        .create_async()
        .await;
    let _fast = root_listing(&mut server, "o/b", json!([file_entry("b.rs", 1)])).await;

    let insights = insights(&server, StubModel::new());
    let session = SessionStore::default().create().await;

    let first = {
        let session = session.clone();
        let insights = insights.clone();
        tokio::spawn(async move { session.load_tree(&insights, "https://github.com/o/a").await })
    };
    arrived.recv().await.unwrap();

    let (second, _) = tokio::join!(
        session.load_tree(&insights, "https://github.com/o/b"),
        async {
            tokio::task::yield_now().await;
            let (open, opened) = &*gate;
            *open.lock().unwrap() = true;
            opened.notify_all();
        }
    );

    assert!(second.unwrap());
    assert!(!first.await.unwrap().unwrap());

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.repository.unwrap().full_name(), "o/b");
    assert_eq!(snapshot.tree.unwrap().nodes[0].name, "b.rs");
}

#[tokio::test]
async fn test_documentation_for_replaced_tree_is_rejected() {
    let mut server = Server::new_async().await;
    let _r = root_listing(&mut server, "o/r", json!([file_entry("lib.rs", 14)])).await;
    let _other = root_listing(&mut server, "o/other", json!([file_entry("main.rs", 3)])).await;
    let _file = server
        .mock("GET", "/repos/o/r/contents/lib.rs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": "lib.rs",
                "path": "lib.rs",
                "type": "file",
                "size": 14,
                "encoding": "base64",
                "content": "cHViIGZuIGYoKSB7fQo="
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (model, mut calls) = GatedModel::new(json!({ "documentation": "Late." }));
    let insights = insights_with_model(&server, model.clone());
    let session = SessionStore::default().create().await;
    assert!(session
        .load_tree(&insights, "https://github.com/o/r")
        .await
        .unwrap());

    let pending = {
        let session = session.clone();
        let insights = insights.clone();
        tokio::spawn(async move { session.document_node(&insights, "lib.rs").await })
    };
    assert_eq!(calls.recv().await, Some("documentFile"));

    assert!(session
        .load_tree(&insights, "https://github.com/o/other")
        .await
        .unwrap());
    model.release();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let tree = session.snapshot().await.tree.unwrap();
    assert_eq!(tree.nodes.len(), 1);
    assert_eq!(tree.nodes[0].name, "main.rs");
    assert!(tree.nodes[0].documentation.is_none());
}

#[tokio::test]
async fn test_answer_after_clear_is_rejected() {
    let server = Server::new_async().await;
    let (model, mut calls) = GatedModel::new(json!({ "answer": "Late." }));
    let insights = insights_with_model(&server, model.clone());
    let session = SessionStore::default().create().await;
    session.start_chat("https://github.com/o/r").await.unwrap();

    let pending = {
        let session = session.clone();
        let insights = insights.clone();
        tokio::spawn(async move { session.ask(&insights, "Still there?").await })
    };
    assert_eq!(calls.recv().await, Some("answerQuestion"));

    session.clear_chat().await;
    model.release();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(session.snapshot().await.chat.is_none());
}

#[tokio::test]
async fn test_answer_after_restart_is_rejected() {
    let server = Server::new_async().await;
    let (model, mut calls) = GatedModel::new(json!({ "answer": "Late." }));
    let insights = insights_with_model(&server, model.clone());
    let session = SessionStore::default().create().await;
    session.start_chat("https://github.com/o/r").await.unwrap();

    let pending = {
        let session = session.clone();
        let insights = insights.clone();
        tokio::spawn(async move { session.ask(&insights, "First?").await })
    };
    assert_eq!(calls.recv().await, Some("answerQuestion"));

    session.start_chat("https://github.com/o/r").await.unwrap();
    model.release();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(session.snapshot().await.chat.unwrap().messages().is_empty());

    // The fresh transcript still accepts answers
    model.release();
    let chat = session.ask(&insights, "Second?").await.unwrap();
    let texts: Vec<&str> = chat.messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["Second?", "Late."]);
}
