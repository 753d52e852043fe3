//! Store-level routes: `init` and `getPath`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::NativeMessagingResult,
    route_trait::{EmptyRequest, NativeMessagingRoute, RouteMetadata},
    traits::StoreProvider,
};

/// Response of `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Absolute root directory of the store
    #[serde(rename = "rootPath")]
    pub root_path: String,
}

/// Ensure the store root exists and report where it is.
///
/// Safe to call any number of times; the extension calls it on startup.
pub struct InitRoute;

#[async_trait]
impl NativeMessagingRoute for InitRoute {
    type Request = EmptyRequest;
    type Response = InitResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "init",
            tags: &["System"],
            description: "Create the store root if needed and return its path",
            idempotent: true,
            mutates: true,
            supports_binary: false,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(_req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let root = state.init().await?;
        tracing::info!(root = %root.display(), "Store initialized");

        Ok(InitResponse {
            root_path: root.display().to_string(),
        })
    }
}

/// Report the store root without touching the filesystem.
pub struct GetPathRoute;

#[async_trait]
impl NativeMessagingRoute for GetPathRoute {
    type Request = EmptyRequest;
    type Response = String;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "getPath",
            tags: &["System"],
            description: "Return the store root path",
            idempotent: true,
            mutates: false,
            supports_binary: false,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(_req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        Ok(state.root_path().display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{DocumentStore, StoreConfig};

    #[tokio::test]
    async fn test_init_creates_and_reports_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("docstore");
        let store = DocumentStore::open(StoreConfig::with_root("test", &root))
            .await
            .unwrap();
        std::fs::remove_dir(&root).unwrap();

        let response = InitRoute::handle(EmptyRequest, &store).await.unwrap();
        assert_eq!(response.root_path, root.display().to_string());
        assert!(root.is_dir());

        let path = GetPathRoute::handle(EmptyRequest, &store).await.unwrap();
        assert_eq!(path, response.root_path);
    }

    #[test]
    fn test_init_response_uses_camel_case_key() {
        let value = serde_json::to_value(InitResponse {
            root_path: "/data".to_string(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"rootPath": "/data"}));
    }

    #[test]
    fn test_metadata() {
        assert!(InitRoute::metadata().is_well_formed());
        assert!(GetPathRoute::metadata().is_well_formed());
        assert!(!GetPathRoute::metadata().mutates);
    }
}
