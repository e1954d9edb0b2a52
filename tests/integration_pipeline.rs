#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end runs of the upload and ask flow against mocked Cohere and
//! Pinecone servers

use finwhiz::FinWhizError;
use finwhiz::assistant::Assistant;
use finwhiz::config::{CohereConfig, Config, HttpConfig, IndexConfig, PineconeConfig};
use finwhiz::database::PineconeIndex;
use finwhiz::document::Document;
use finwhiz::embeddings::CohereEmbedder;
use finwhiz::generation::CohereChat;
use finwhiz::remote::{RemoteFailure, Service};
use finwhiz::session::Session;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Clients {
    embedder: CohereEmbedder,
    index: PineconeIndex,
    chat: CohereChat,
}

fn test_config(cohere: &MockServer, pinecone: &MockServer) -> Config {
    Config {
        index: IndexConfig {
            dimension: 4,
            readiness_poll_ms: 1,
            ..IndexConfig::default()
        },
        cohere: CohereConfig {
            base_url: cohere.uri(),
            ..CohereConfig::default()
        },
        pinecone: PineconeConfig {
            control_plane_url: pinecone.uri(),
            ..PineconeConfig::default()
        },
        http: HttpConfig {
            timeout_seconds: 5,
            retry_attempts: 1,
            initial_backoff_ms: 1,
        },
        ..Config::default()
    }
}

fn create_clients(config: &Config) -> Clients {
    Clients {
        embedder: CohereEmbedder::new(&config.cohere, &config.http, "co-test-key")
            .expect("Failed to create embedder"),
        index: PineconeIndex::new(&config.pinecone, &config.index, &config.http, "pc-test-key")
            .expect("Failed to create index client"),
        chat: CohereChat::new(&config.cohere, &config.http, "co-test-key")
            .expect("Failed to create chat client"),
    }
}

/// Control plane with no indexes yet, accepting a create and reporting it ready
async fn mount_empty_control_plane(pinecone: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
        .mount(pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(header("api-key", "pc-test-key"))
        .and(body_partial_json(json!({
            "name": "finwhiz-index",
            "dimension": 4,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "finwhiz-index" })))
        .expect(1)
        .mount(pinecone)
        .await;

    Mock::given(method("GET"))
        .and(path("/indexes/finwhiz-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "finwhiz-index",
            "dimension": 4,
            "host": pinecone.uri(),
            "status": { "ready": true, "state": "Ready" }
        })))
        .mount(pinecone)
        .await;
}

#[tokio::test]
async fn cash_document_question_round_trip() {
    let cohere = MockServer::start().await;
    let pinecone = MockServer::start().await;
    mount_empty_control_plane(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .and(header("authorization", "Bearer co-test-key"))
        .and(body_partial_json(json!({
            "input_type": "search_document",
            "texts": ["Cash is $5"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3, 0.4]]
        })))
        .expect(1)
        .mount(&cohere)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(body_partial_json(json!({
            "vectors": [{
                "id": "chunk-0",
                "values": [0.1, 0.2, 0.3, 0.4],
                "metadata": { "text": "Cash is $5" }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .and(body_partial_json(json!({
            "input_type": "search_query",
            "texts": ["What amount is mentioned?"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3, 0.4]]
        })))
        .expect(1)
        .mount(&cohere)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "topK": 5, "includeMetadata": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "chunk-0", "score": 0.99, "metadata": { "text": "Cash is $5" } }
            ]
        })))
        .expect(1)
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_string_contains("Context: Cash is $5"))
        .and(body_string_contains("Question: What amount is mentioned?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "The document mentions $5."
        })))
        .expect(1)
        .mount(&cohere)
        .await;

    let config = test_config(&cohere, &pinecone);
    let clients = create_clients(&config);
    let assistant = Assistant::new(&clients.embedder, &clients.index, &clients.chat, &config);

    let mut session = Session::new();
    assert_eq!(session.history().len(), 0);

    let handle = session
        .upload(&assistant, &Document::plain_text("cash.txt", "Cash is $5"))
        .expect("upload should succeed")
        .clone();
    assert_eq!(handle.name, "finwhiz-index");
    assert!(
        handle
            .namespace
            .as_deref()
            .is_some_and(|ns| ns.starts_with("doc-"))
    );

    let entry = session
        .ask(&assistant, "What amount is mentioned?")
        .expect("ask should succeed")
        .clone();
    assert_eq!(entry.answer, "The document mentions $5.");
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn existing_collection_is_not_recreated() {
    let cohere = MockServer::start().await;
    let pinecone = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "name": "finwhiz-index", "dimension": 4, "host": pinecone.uri() }]
        })))
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&pinecone)
        .await;

    Mock::given(method("GET"))
        .and(path("/indexes/finwhiz-index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "finwhiz-index",
            "host": pinecone.uri(),
            "status": { "ready": true, "state": "Ready" }
        })))
        .mount(&pinecone)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]
        })))
        .expect(1)
        .mount(&cohere)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 3 })))
        .expect(1)
        .mount(&pinecone)
        .await;

    let config = test_config(&cohere, &pinecone);
    let clients = create_clients(&config);
    let assistant = Assistant::new(&clients.embedder, &clients.index, &clients.chat, &config);

    let text: String = "abcdefghij".chars().cycle().take(1200).collect();
    assistant
        .index_document(&Document::plain_text("long.txt", text))
        .expect("indexing should succeed");
}

#[tokio::test]
async fn embedding_auth_failure_leaves_session_unchanged() {
    let cohere = MockServer::start().await;
    let pinecone = MockServer::start().await;
    mount_empty_control_plane(&pinecone).await;

    Mock::given(method("POST"))
        .and(path("/v1/embed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "invalid api token"
        })))
        .expect(1)
        .mount(&cohere)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(0)
        .mount(&pinecone)
        .await;

    let config = test_config(&cohere, &pinecone);
    let clients = create_clients(&config);
    let assistant = Assistant::new(&clients.embedder, &clients.index, &clients.chat, &config);

    let mut session = Session::new();
    let error = session
        .upload(&assistant, &Document::plain_text("cash.txt", "Cash is $5"))
        .expect_err("upload should fail");

    match error {
        FinWhizError::RemoteService(remote) => {
            assert_eq!(remote.service, Service::Embedding);
            assert_eq!(remote.kind, RemoteFailure::Auth(401));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(session.collection().is_none());
    assert!(session.history().is_empty());
}
