//! Single-document routes: `write`, `add`, `read`, `delete` and `exists`.
//!
//! All of them take an optional `binary` flag. With `binary: true` the
//! payload (or the returned value) is base64 text and the document lives in
//! a raw file without extension.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{CollectionName, DocumentId, Encoding};

use crate::{
    error::{NativeMessagingError, NativeMessagingResult},
    route_trait::{NativeMessagingRoute, RouteMetadata},
    traits::StoreProvider,
};

/// Request of `write`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteRequest {
    /// Target collection, created on first use
    pub collection: CollectionName,
    /// Caller-chosen ID; a JSON string or non-negative integer
    pub id: DocumentId,
    /// Any JSON value, or base64 text when `binary` is set
    pub payload: Value,
    /// Store raw bytes instead of JSON
    #[serde(default)]
    pub binary: bool,
}

/// Request of `add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRequest {
    /// Target collection, created on first use
    pub collection: CollectionName,
    /// Any JSON value, or base64 text when `binary` is set
    pub payload: Value,
    /// Store raw bytes instead of JSON
    #[serde(default)]
    pub binary: bool,
}

/// Response of `add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddResponse {
    /// The allocated ID
    pub id: DocumentId,
}

/// Request of `read`, `delete` and `exists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentRequest {
    pub collection: CollectionName,
    pub id: DocumentId,
    /// Address the raw-bytes file rather than the JSON one
    #[serde(default)]
    pub binary: bool,
}

/// Response of `exists`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

fn validate_binary_payload(payload: &Value, binary: bool) -> NativeMessagingResult<()> {
    if binary && !payload.is_string() {
        return Err(NativeMessagingError::validation(
            "payload",
            "binary payload must be a base64 string",
        ));
    }
    Ok(())
}

/// Create or fully replace the document at `collection`/`id`.
pub struct WriteRoute;

#[async_trait]
impl NativeMessagingRoute for WriteRoute {
    type Request = WriteRequest;
    type Response = ();

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "write",
            tags: &["Documents", "Write"],
            description: "Create or replace a document under a caller-chosen ID",
            idempotent: true,
            mutates: true,
            supports_binary: true,
        }
    }

    async fn validate_request(req: &Self::Request) -> NativeMessagingResult<()> {
        validate_binary_payload(&req.payload, req.binary)
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let encoding = Encoding::from_flag(req.binary);
        state
            .write(&req.collection, &req.id, &req.payload, encoding)
            .await?;

        tracing::info!(
            collection = %req.collection,
            id = %req.id,
            binary = req.binary,
            "Document written"
        );
        Ok(())
    }
}

/// Store a document under a newly allocated ID.
pub struct AddRoute;

#[async_trait]
impl NativeMessagingRoute for AddRoute {
    type Request = AddRequest;
    type Response = AddResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "add",
            tags: &["Documents", "Write"],
            description: "Store a document under a freshly allocated, never reused ID",
            idempotent: false,
            mutates: true,
            supports_binary: true,
        }
    }

    async fn validate_request(req: &Self::Request) -> NativeMessagingResult<()> {
        validate_binary_payload(&req.payload, req.binary)
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let id = state
            .add(&req.collection, req.payload, Encoding::from_flag(req.binary))
            .await?;

        tracing::info!(collection = %req.collection, id = %id, "Document added");
        Ok(AddResponse { id })
    }
}

/// Read a document back.
pub struct ReadRoute;

#[async_trait]
impl NativeMessagingRoute for ReadRoute {
    type Request = DocumentRequest;
    type Response = Value;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "read",
            tags: &["Documents", "Read"],
            description: "Read a document; binary documents come back as base64",
            idempotent: true,
            mutates: false,
            supports_binary: true,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        // Collection and ID are validated while deserializing
        Ok(())
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let value = state
            .read(&req.collection, &req.id, Encoding::from_flag(req.binary))
            .await?;
        tracing::debug!(collection = %req.collection, id = %req.id, "Document read");
        Ok(value)
    }
}

/// Remove a document.
pub struct DeleteRoute;

#[async_trait]
impl NativeMessagingRoute for DeleteRoute {
    type Request = DocumentRequest;
    type Response = ();

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "delete",
            tags: &["Documents", "Write"],
            description: "Delete a document; missing documents report not found",
            idempotent: false,
            mutates: true,
            supports_binary: true,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        state
            .delete(&req.collection, &req.id, Encoding::from_flag(req.binary))
            .await?;
        tracing::info!(collection = %req.collection, id = %req.id, "Document deleted");
        Ok(())
    }
}

/// Check whether a document exists without reading it.
pub struct ExistsRoute;

#[async_trait]
impl NativeMessagingRoute for ExistsRoute {
    type Request = DocumentRequest;
    type Response = ExistsResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "exists",
            tags: &["Documents", "Read"],
            description: "Report whether a document exists",
            idempotent: true,
            mutates: false,
            supports_binary: true,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let exists = state
            .exists(&req.collection, &req.id, Encoding::from_flag(req.binary))
            .await?;
        Ok(ExistsResponse { exists })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::{DocumentStore, StoreConfig};

    async fn store() -> (tempfile::TempDir, DocumentStore) {
        let temp = tempfile::TempDir::new().unwrap();
        let store = DocumentStore::open(StoreConfig::with_root("test", temp.path()))
            .await
            .unwrap();
        (temp, store)
    }

    fn document(collection: &str, id: &str, binary: bool) -> DocumentRequest {
        serde_json::from_value(json!({"collection": collection, "id": id, "binary": binary}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_read_delete_cycle() {
        let (_temp, store) = store().await;

        let write: WriteRequest = serde_json::from_value(json!({
            "collection": "patients",
            "id": "1",
            "payload": {"name": "Amina"}
        }))
        .unwrap();
        WriteRoute::validate_request(&write).await.unwrap();
        WriteRoute::handle(write, &store).await.unwrap();

        let value = ReadRoute::handle(document("patients", "1", false), &store)
            .await
            .unwrap();
        assert_eq!(value, json!({"name": "Amina"}));

        let exists = ExistsRoute::handle(document("patients", "1", false), &store)
            .await
            .unwrap();
        assert!(exists.exists);

        DeleteRoute::handle(document("patients", "1", false), &store)
            .await
            .unwrap();
        let err = DeleteRoute::handle(document("patients", "1", false), &store)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found");
    }

    #[tokio::test]
    async fn test_add_returns_allocated_id() {
        let (_temp, store) = store().await;
        let add: AddRequest =
            serde_json::from_value(json!({"collection": "notes", "payload": {"text": "hi"}}))
                .unwrap();

        let response = AddRoute::handle(add, &store).await.unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"id": "1"}));
    }

    #[test]
    fn test_requests_reject_unknown_and_invalid_fields() {
        assert!(serde_json::from_value::<WriteRequest>(json!({
            "collection": "patients", "id": "1", "payload": {}, "merge": true
        }))
        .is_err());
        assert!(serde_json::from_value::<WriteRequest>(json!({
            "collection": "patients", "id": "1"
        }))
        .is_err());
        assert!(serde_json::from_value::<DocumentRequest>(json!({
            "collection": "../etc", "id": "1"
        }))
        .is_err());
        assert!(serde_json::from_value::<DocumentRequest>(json!({
            "collection": "patients", "id": ".next_id"
        }))
        .is_err());

        let numeric: DocumentRequest =
            serde_json::from_value(json!({"collection": "patients", "id": 42})).unwrap();
        assert_eq!(numeric.id.as_str(), "42");
        assert!(!numeric.binary);
    }

    #[test]
    fn test_binary_payload_must_be_text() {
        let write: WriteRequest = serde_json::from_value(json!({
            "collection": "images", "id": "x", "payload": [1, 2, 3], "binary": true
        }))
        .unwrap();
        let err = tokio_test::block_on(WriteRoute::validate_request(&write)).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_metadata() {
        for meta in [
            WriteRoute::metadata(),
            AddRoute::metadata(),
            ReadRoute::metadata(),
            DeleteRoute::metadata(),
            ExistsRoute::metadata(),
        ] {
            assert!(meta.is_well_formed(), "{:?}", meta);
            assert!(meta.supports_binary);
        }
        assert!(!AddRoute::metadata().idempotent);
    }
}
