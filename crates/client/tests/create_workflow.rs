//! Creating documents and libraries in a folder

use std::sync::Arc;

use gitpad_client::mock::{MockTransport, ScriptedInteraction, StaticConsent};
use gitpad_client::{
    ClientConfig, ClientError, FileFlavor, GitHubClient, Locator, MemoryTokenStore, Method, codec,
};
use serde_json::json;

async fn signed_in_client(
    transport: Arc<MockTransport>,
    interaction: Arc<ScriptedInteraction>,
) -> GitHubClient {
    let client = GitHubClient::builder(ClientConfig::new(
        "cid",
        "https://relay.example.com/github",
    ))
    .transport(transport.clone())
    .consent(Arc::new(StaticConsent::new("code")))
    .interaction(interaction)
    .token_store(Arc::new(MemoryTokenStore::with_token("t")))
    .build()
    .await
    .unwrap();

    transport.on_json(Method::Get, "/user", 200, json!({"id": 42}));
    client
}

fn folder() -> Locator {
    Locator::parse("a/b/main/docs").unwrap()
}

#[tokio::test]
async fn test_new_document_is_written_on_first_save() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new());
    let client = signed_in_client(transport.clone(), interaction.clone()).await;

    transport.on(Method::Get, "/contents/docs/new.xml", 404, "{}");

    let mut file = client
        .insert_file("new.xml", b"<mxfile/>", &folder())
        .await
        .unwrap();

    assert_eq!(file.flavor, FileFlavor::Document);
    assert!(file.meta.is_new);
    assert_eq!(file.meta.sha, None);
    assert_eq!(file.meta.path, "docs/new.xml");
    assert!(transport.requests_to(Method::Put, "/contents/").is_empty());

    transport.on_json(
        Method::Put,
        "/contents/docs/new.xml",
        201,
        json!({"content": {"name": "new.xml", "path": "docs/new.xml", "sha": "s1"}}),
    );
    client.save_file(&mut file).await.unwrap();

    let body = transport.requests_to(Method::Put, "/contents/")[0]
        .json_body()
        .unwrap();
    assert!(body.get("sha").is_none());
    assert_eq!(body["message"], "Added new.xml");
    assert!(!file.meta.is_new);
    assert_eq!(file.meta.sha.as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_replacing_existing_document_keeps_its_sha() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new().answer_confirm(true));
    let client = signed_in_client(transport.clone(), interaction.clone()).await;

    transport.on_json(
        Method::Get,
        "/contents/docs/old.xml",
        200,
        json!({"name": "old.xml", "path": "docs/old.xml", "sha": "prev", "type": "file"}),
    );

    let file = client
        .insert_file("old.xml", b"<mxfile/>", &folder())
        .await
        .unwrap();

    assert!(file.meta.is_new);
    assert_eq!(file.meta.sha.as_deref(), Some("prev"));
    assert_eq!(
        interaction.confirms(),
        vec!["docs/old.xml already exists. Do you want to replace it?".to_string()]
    );
}

#[tokio::test]
async fn test_declining_replacement_cancels() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new().answer_confirm(false));
    let client = signed_in_client(transport.clone(), interaction).await;

    transport.on_json(
        Method::Get,
        "/contents/docs/old.xml",
        200,
        json!({"name": "old.xml", "path": "docs/old.xml", "sha": "prev", "type": "file"}),
    );

    let err = client
        .insert_file("old.xml", b"<mxfile/>", &folder())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn test_library_is_written_immediately() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new());
    let client = signed_in_client(transport.clone(), interaction.clone()).await;

    transport.on(Method::Get, "/contents/docs/lib.xml", 404, "{}");
    transport.on_json(
        Method::Put,
        "/contents/docs/lib.xml",
        201,
        json!({
            "content": {
                "name": "lib.xml",
                "path": "docs/lib.xml",
                "sha": "L1",
                "html_url": "https://github.com/a/b/blob/main/docs/lib.xml"
            }
        }),
    );

    let library = client
        .insert_library("lib.xml", b"<mxlibrary>[]</mxlibrary>", &folder(), false)
        .await
        .unwrap();

    assert!(library.is_library());
    assert!(!library.meta.is_new);
    assert_eq!(library.meta.sha.as_deref(), Some("L1"));
    assert_eq!(library.text(), Some("<mxlibrary>[]</mxlibrary>"));

    let body = transport.requests_to(Method::Put, "/contents/")[0]
        .json_body()
        .unwrap();
    assert_eq!(body["message"], "Added lib.xml");
    assert_eq!(body["content"], codec::encode(b"<mxlibrary>[]</mxlibrary>"));
    assert!(body.get("sha").is_none());
}

#[tokio::test]
async fn test_library_with_encoded_content() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new());
    let client = signed_in_client(transport.clone(), interaction).await;

    transport.on(Method::Get, "/contents/docs/lib.xml", 404, "{}");
    transport.on_json(
        Method::Put,
        "/contents/docs/lib.xml",
        201,
        json!({"content": {"name": "lib.xml", "path": "docs/lib.xml", "sha": "L1"}}),
    );

    let library = client
        .insert_library("lib.xml", b"PG14ZmlsZS8+", &folder(), true)
        .await
        .unwrap();

    assert_eq!(library.text(), Some("<mxfile/>"));
    let body = transport.requests_to(Method::Put, "/contents/")[0]
        .json_body()
        .unwrap();
    assert_eq!(body["content"], "PG14ZmlsZS8+");
}

#[tokio::test]
async fn test_plain_write_creates_without_sha() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new());
    let client = signed_in_client(transport.clone(), interaction).await;

    transport.on_json(
        Method::Put,
        "/contents/f.txt",
        201,
        json!({"content": {"name": "f.txt", "path": "f.txt", "sha": "n1"}}),
    );

    let content = codec::encode(&[b'x'; 375]);
    assert_eq!(content.len(), 500);

    let target = Locator::parse("a/b/main/f.txt").unwrap();
    let response = client
        .gateway()
        .write_file(&target, "Added f.txt", &content, None)
        .await
        .unwrap();
    assert_eq!(response.status, 201);

    let put = &transport.requests_to(Method::Put, "/contents/")[0];
    assert_eq!(put.url.path(), "/repos/a/b/contents/f.txt");
    assert_eq!(put.url.query(), Some("ref=main"));

    let body = put.json_body().unwrap();
    assert_eq!(body["path"], "f.txt");
    assert!(body.get("sha").is_none());
    assert_eq!(body.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_oversized_library_is_rejected_before_writing() {
    let transport = Arc::new(MockTransport::new());
    let interaction = Arc::new(ScriptedInteraction::new());
    let client = signed_in_client(transport.clone(), interaction).await;

    transport.on(Method::Get, "/contents/docs/big.xml", 404, "{}");

    let err = client
        .insert_library("big.xml", &vec![b'x'; 800_000], &folder(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::SizeExceeded { .. }));
    assert!(transport.requests_to(Method::Put, "/contents/").is_empty());
}
