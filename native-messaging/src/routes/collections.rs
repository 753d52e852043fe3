//! Collection-wide routes: `list` and `search`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{CollectionName, Filter};

use crate::{
    error::NativeMessagingResult,
    route_trait::{NativeMessagingRoute, RouteMetadata},
    traits::StoreProvider,
};

/// Request of `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRequest {
    /// Collection to read
    pub collection: CollectionName,
}

/// Request of `search`.
///
/// `filter` is a list of `{field, op, value}` clauses that must all match.
/// Omitting it matches every document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    /// Collection to scan
    pub collection: CollectionName,
    /// Conjunctive clauses; checked by the store before scanning
    #[serde(default)]
    pub filter: Filter,
}

/// Every structured document in a collection.
pub struct ListRoute;

#[async_trait]
impl NativeMessagingRoute for ListRoute {
    type Request = ListRequest;
    type Response = Vec<Value>;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "list",
            tags: &["Collections", "Read"],
            description: "Return every structured document in a collection",
            idempotent: true,
            mutates: false,
            supports_binary: false,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let documents = state.list(&req.collection).await?;
        tracing::debug!(collection = %req.collection, count = documents.len(), "Collection listed");
        Ok(documents)
    }
}

/// Structured documents matching a declarative filter.
pub struct SearchRoute;

#[async_trait]
impl NativeMessagingRoute for SearchRoute {
    type Request = SearchRequest;
    type Response = Vec<Value>;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            route_id: "search",
            tags: &["Collections", "Read"],
            description: "Return structured documents matching a declarative filter",
            idempotent: true,
            mutates: false,
            supports_binary: false,
        }
    }

    async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
        Ok(())
    }

    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync,
    {
        let matched = state.search(&req.collection, &req.filter).await?;
        tracing::debug!(
            collection = %req.collection,
            clauses = req.filter.clauses().len(),
            matched = matched.len(),
            "Search complete"
        );
        Ok(matched)
    }
}
