//! Integration tests for native-messaging.
//!
//! These run against a real `DocumentStore` in a temporary directory, either
//! through `process_message` or over an in-memory framed pipe.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use docstore_native_messaging::{
    IncomingMessage, NativeMessagingConfig, NativeMessagingHost, OutgoingMessage, StoreProvider,
};
use storage::{
    CollectionName, DocumentId, DocumentStore, Encoding, Filter, StoreConfig, StoreResult,
};

async fn open_store(temp: &TempDir) -> DocumentStore {
    DocumentStore::open(StoreConfig::with_root("test", temp.path().join("store")))
        .await
        .expect("Failed to open test store")
}

/// Create a test host backed by a store in `temp`.
async fn create_test_host(temp: &TempDir) -> NativeMessagingHost {
    let store = open_store(temp).await;
    NativeMessagingHost::new(Arc::new(store), NativeMessagingConfig::default())
}

async fn call(host: &NativeMessagingHost, route: &str, payload: Value) -> OutgoingMessage {
    let message = IncomingMessage {
        request_id: format!("test-{}", route),
        route: route.to_string(),
        payload,
    };
    host.process_message(message).await
}

fn error_code(response: &OutgoingMessage) -> &str {
    assert!(!response.ok, "Expected failure, got {:?}", response);
    assert!(response.data.is_none());
    response.error.as_ref().expect("failure must carry an error").code.as_str()
}

fn store_root(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("store")
}

#[tokio::test]
async fn test_init_write_read_scenario() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let init = call(&host, "init", json!(null)).await;
    assert!(init.ok);
    let root = init.data.unwrap()["rootPath"].as_str().unwrap().to_string();
    assert_eq!(Path::new(&root), store_root(&temp));
    assert!(Path::new(&root).is_dir());

    let write = call(
        &host,
        "write",
        json!({"collection": "patients", "id": "1", "payload": {"name": "Amina"}}),
    )
    .await;
    assert!(write.ok, "{:?}", write);
    assert_eq!(write.request_id, "test-write");

    let read = call(&host, "read", json!({"collection": "patients", "id": "1"})).await;
    assert!(read.ok);
    assert_eq!(read.data, Some(json!({"name": "Amina"})));

    let on_disk = std::fs::read_to_string(store_root(&temp).join("patients/1.json")).unwrap();
    assert!(on_disk.contains('\n'), "structured documents are pretty-printed");

    let path = call(&host, "getPath", json!(null)).await;
    assert_eq!(path.data, Some(json!(root)));
}

#[tokio::test]
async fn test_delete_missing_document_is_not_found() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let response = call(&host, "delete", json!({"collection": "patients", "id": "999"})).await;
    assert_eq!(error_code(&response), "NOT_FOUND");

    let error = response.error.unwrap();
    assert_eq!(error.message, "not found");
    assert_eq!(error.request_id.as_deref(), Some("test-delete"));

    let read = call(&host, "read", json!({"collection": "patients", "id": "999"})).await;
    assert_eq!(error_code(&read), "NOT_FOUND");
}

#[tokio::test]
async fn test_binary_document_round_trip() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    // [1, 2, 3]
    let encoded = "AQID";
    let write = call(
        &host,
        "write",
        json!({"collection": "images", "id": "x-ray-1", "payload": encoded, "binary": true}),
    )
    .await;
    assert!(write.ok, "{:?}", write);

    let raw = std::fs::read(store_root(&temp).join("images/x-ray-1")).unwrap();
    assert_eq!(raw, vec![1u8, 2, 3]);

    let read = call(
        &host,
        "read",
        json!({"collection": "images", "id": "x-ray-1", "binary": true}),
    )
    .await;
    assert_eq!(read.data, Some(json!(encoded)));

    let exists = call(
        &host,
        "exists",
        json!({"collection": "images", "id": "x-ray-1", "binary": true}),
    )
    .await;
    assert_eq!(exists.data, Some(json!({"exists": true})));

    // Binary documents stay out of structured listings
    let list = call(&host, "list", json!({"collection": "images"})).await;
    assert_eq!(list.data, Some(json!([])));
}

#[tokio::test]
async fn test_list_brand_new_collection_is_empty() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let response = call(&host, "list", json!({"collection": "brand_new_collection"})).await;
    assert!(response.ok);
    assert_eq!(response.data, Some(json!([])));

    let search = call(
        &host,
        "search",
        json!({"collection": "brand_new_collection", "filter": [{"field": "a", "op": "exists"}]}),
    )
    .await;
    assert!(search.ok);
    assert_eq!(search.data, Some(json!([])));
}

#[tokio::test]
async fn test_search_contains_scenario() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    for (id, name) in [("1", "Alice"), ("2", "Bob"), ("3", "Chen")] {
        let write = call(
            &host,
            "write",
            json!({"collection": "patients", "id": id, "payload": {"name": name, "age": 30}}),
        )
        .await;
        assert!(write.ok);
    }

    let response = call(
        &host,
        "search",
        json!({
            "collection": "patients",
            "filter": [{"field": "name", "op": "contains", "value": "ali"}]
        }),
    )
    .await;
    assert!(response.ok);
    assert_eq!(response.data, Some(json!([{"name": "Alice", "age": 30}])));

    let conjunction = call(
        &host,
        "search",
        json!({
            "collection": "patients",
            "filter": [
                {"field": "age", "op": "gte", "value": 30},
                {"field": "name", "op": "in", "value": ["Bob", "Chen"]}
            ]
        }),
    )
    .await;
    assert_eq!(conjunction.data.unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_overwrite_replaces_document() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    for payload in [json!({"a": 1, "b": 2}), json!({"c": 3})] {
        let write = call(
            &host,
            "write",
            json!({"collection": "notes", "id": "n", "payload": payload}),
        )
        .await;
        assert!(write.ok);
    }

    let read = call(&host, "read", json!({"collection": "notes", "id": "n"})).await;
    assert_eq!(read.data, Some(json!({"c": 3})));
}

#[tokio::test]
async fn test_add_allocates_unique_ids_across_restart() {
    let temp = TempDir::new().unwrap();

    let first = {
        let host = create_test_host(&temp).await;
        let add = call(&host, "add", json!({"collection": "notes", "payload": {"text": "a"}})).await;
        assert!(add.ok);
        add.data.unwrap()["id"].as_str().unwrap().to_string()
    };

    let host = create_test_host(&temp).await;
    let delete = call(&host, "delete", json!({"collection": "notes", "id": first})).await;
    assert!(delete.ok);

    let add = call(&host, "add", json!({"collection": "notes", "payload": {"text": "b"}})).await;
    let second = add.data.unwrap()["id"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    let read = call(&host, "read", json!({"collection": "notes", "id": second})).await;
    assert_eq!(read.data, Some(json!({"text": "b", "id": second})));
}

#[tokio::test]
async fn test_validation_errors() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let cases = [
        ("write", json!({"id": "1", "payload": {}})),
        ("write", json!({"collection": "patients", "id": "1", "payload": {}, "merge": true})),
        ("write", json!({"collection": "../etc", "id": "1", "payload": {}})),
        ("read", json!({"collection": "patients", "id": "a/b"})),
        ("read", json!({"collection": "patients", "id": ""})),
        (
            "write",
            json!({"collection": "images", "id": "x", "payload": "not base64!!", "binary": true}),
        ),
        (
            "search",
            json!({"collection": "patients", "filter": [{"field": "name", "op": "matches"}]}),
        ),
        ("init", json!({"unexpected": true})),
        (
            "write",
            json!({"collection": "patients", "id": "a.json", "payload": "AQID", "binary": true}),
        ),
    ];

    for (route, payload) in cases {
        let response = call(&host, route, payload.clone()).await;
        assert_eq!(
            error_code(&response),
            "VALIDATION_ERROR",
            "{} {} -> {:?}",
            route,
            payload,
            response
        );
    }

    assert!(!store_root(&temp).join("images/x").exists());
}

#[tokio::test]
async fn test_corrupt_document_is_decode_error() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let dir = store_root(&temp).join("patients");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("5.json"), b"{\"name\": ").unwrap();

    let read = call(&host, "read", json!({"collection": "patients", "id": "5"})).await;
    assert_eq!(error_code(&read), "DECODE_ERROR");

    let list = call(&host, "list", json!({"collection": "patients"})).await;
    assert_eq!(error_code(&list), "DECODE_ERROR");
}

#[tokio::test]
async fn test_unknown_route() {
    let temp = TempDir::new().unwrap();
    let host = create_test_host(&temp).await;

    let response = call(&host, "query", json!({"collection": "patients"})).await;
    assert_eq!(error_code(&response), "ROUTE_NOT_FOUND");
}

/// Store that panics whenever a collection is listed.
struct PanickyStore {
    inner: DocumentStore,
}

#[async_trait]
impl StoreProvider for PanickyStore {
    async fn init(&self) -> StoreResult<std::path::PathBuf> {
        self.inner.init().await
    }

    fn root_path(&self) -> std::path::PathBuf {
        self.inner.root().to_path_buf()
    }

    async fn write(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        payload: &Value,
        encoding: Encoding,
    ) -> StoreResult<()> {
        self.inner.write(collection, id, payload, encoding).await
    }

    async fn add(
        &self,
        collection: &CollectionName,
        payload: Value,
        encoding: Encoding,
    ) -> StoreResult<DocumentId> {
        self.inner.add(collection, payload, encoding).await
    }

    async fn read(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<Value> {
        self.inner.read(collection, id, encoding).await
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<()> {
        self.inner.delete(collection, id, encoding).await
    }

    async fn list(&self, _collection: &CollectionName) -> StoreResult<Vec<Value>> {
        panic!("listing exploded");
    }

    async fn exists(
        &self,
        collection: &CollectionName,
        id: &DocumentId,
        encoding: Encoding,
    ) -> StoreResult<bool> {
        self.inner.exists(collection, id, encoding).await
    }

    async fn search(&self, collection: &CollectionName, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.inner.search(collection, filter).await
    }
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    let temp = TempDir::new().unwrap();
    let store = PanickyStore {
        inner: open_store(&temp).await,
    };
    let host = NativeMessagingHost::new(Arc::new(store), NativeMessagingConfig::default());

    let response = call(&host, "list", json!({"collection": "patients"})).await;
    assert_eq!(error_code(&response), "INTERNAL_ERROR");
    assert!(response.error.unwrap().message.contains("listing exploded"));

    // The host keeps serving afterwards
    let write = call(
        &host,
        "write",
        json!({"collection": "patients", "id": "1", "payload": {"ok": true}}),
    )
    .await;
    assert!(write.ok);
}

fn frame(body: &[u8]) -> Vec<u8> {
    let mut data = (body.len() as u32).to_le_bytes().to_vec();
    data.extend_from_slice(body);
    data
}

fn request_frame(request_id: &str, route: &str, payload: Value) -> Vec<u8> {
    let body = json!({"request_id": request_id, "route": route, "payload": payload});
    frame(&serde_json::to_vec(&body).unwrap())
}

async fn read_response(client: &mut DuplexStream) -> Option<OutgoingMessage> {
    let mut header = [0u8; 4];
    if client.read_exact(&mut header).await.is_err() {
        return None;
    }
    let mut body = vec![0u8; u32::from_le_bytes(header) as usize];
    client.read_exact(&mut body).await.ok()?;
    Some(serde_json::from_slice(&body).unwrap())
}

/// Spawn a host serving one end of an in-memory pipe.
fn spawn_host(
    host: NativeMessagingHost,
) -> (DuplexStream, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let host = Arc::new(host);
    let handle = tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(server);
        host.serve(reader, writer).await
    });
    (client, handle)
}

#[tokio::test]
async fn test_serve_answers_every_frame() {
    let temp = TempDir::new().unwrap();
    let (mut client, handle) = spawn_host(create_test_host(&temp).await);

    let mut input = Vec::new();
    input.extend(request_frame("r-1", "init", json!(null)));
    for i in 0..8 {
        input.extend(request_frame(
            &format!("w-{}", i),
            "add",
            json!({"collection": "events", "payload": {"seq": i}}),
        ));
    }
    input.extend(frame(b"not json"));
    input.extend(frame(br#"{"request_id": "r-9", "payload": {}}"#));
    input.extend(request_frame("r-10", "list", json!({"collection": "missing"})));
    client.write_all(&input).await.unwrap();
    client.shutdown().await.unwrap();

    let mut responses = Vec::new();
    while let Some(response) = read_response(&mut client).await {
        responses.push(response);
    }
    handle.await.unwrap().unwrap();

    assert_eq!(responses.len(), 12);

    let by_id = |id: &str| {
        responses
            .iter()
            .find(|r| r.request_id == id)
            .unwrap_or_else(|| panic!("no response for {}", id))
    };

    assert!(by_id("r-1").ok);
    assert_eq!(by_id("r-10").data, Some(json!([])));
    assert_eq!(by_id("unknown").error.as_ref().unwrap().code, "PROTOCOL_ERROR");
    assert_eq!(by_id("r-9").error.as_ref().unwrap().code, "PROTOCOL_ERROR");

    let mut ids: Vec<String> = (0..8)
        .map(|i| {
            let response = by_id(&format!("w-{}", i));
            assert!(response.ok);
            response.data.as_ref().unwrap()["id"].as_str().unwrap().to_string()
        })
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8, "allocated IDs must be unique");
}

#[tokio::test]
async fn test_serve_skips_oversized_frame() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp).await;
    let config = NativeMessagingConfig {
        max_message_size: 512,
        ..NativeMessagingConfig::default()
    };
    let (mut client, handle) = spawn_host(NativeMessagingHost::new(Arc::new(store), config));

    let mut input = frame(&vec![b' '; 2048]);
    input.extend(request_frame("after", "getPath", json!(null)));
    client.write_all(&input).await.unwrap();
    client.shutdown().await.unwrap();

    let first = read_response(&mut client).await.unwrap();
    assert_eq!(first.request_id, "unknown");
    assert_eq!(first.error.unwrap().code, "PROTOCOL_ERROR");

    let second = read_response(&mut client).await.unwrap();
    assert_eq!(second.request_id, "after");
    assert!(second.ok);

    assert!(read_response(&mut client).await.is_none());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_serve_truncated_frame_is_fatal() {
    let temp = TempDir::new().unwrap();
    let (mut client, handle) = spawn_host(create_test_host(&temp).await);

    let mut input = 100u32.to_le_bytes().to_vec();
    input.extend_from_slice(b"{\"request_id\"");
    client.write_all(&input).await.unwrap();
    client.shutdown().await.unwrap();

    assert!(read_response(&mut client).await.is_none());
    assert!(handle.await.unwrap().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_every_frame_gets_one_reply_and_stream_stays_in_sync(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..6),
    ) {
        let temp = TempDir::new().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let responses = runtime.block_on(async {
            let (mut client, handle) = spawn_host(create_test_host(&temp).await);

            let mut input = Vec::new();
            for body in &bodies {
                input.extend(frame(body));
            }
            input.extend(request_frame("tail", "getPath", json!(null)));
            client.write_all(&input).await.unwrap();
            client.shutdown().await.unwrap();

            let mut responses = Vec::new();
            while let Some(response) = read_response(&mut client).await {
                responses.push(response);
            }
            handle.await.unwrap().unwrap();
            responses
        });

        prop_assert_eq!(responses.len(), bodies.len() + 1);
        let tail = responses.iter().find(|r| r.request_id == "tail");
        prop_assert!(tail.is_some_and(|r| r.ok));
    }
}
