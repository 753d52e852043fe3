//! Native messaging route trait.
//!
//! Every route declares typed request and response shapes, validates the
//! request before the store is touched, and describes itself through
//! [`RouteMetadata`]. The router erases the types and handles JSON.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::fmt::Debug;

use crate::error::NativeMessagingResult;
use crate::traits::StoreProvider;

/// Route metadata for native messaging routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMetadata {
    /// Route identifier as it appears in the `route` field on the wire
    pub route_id: &'static str,

    /// Category tags (e.g. `["Documents", "Write"]`)
    pub tags: &'static [&'static str],

    /// Human-readable description
    pub description: &'static str,

    /// Is this route idempotent? (safe to repeat with the same payload)
    pub idempotent: bool,

    /// Does this route change anything on disk?
    pub mutates: bool,

    /// Does this route honor the `binary` flag?
    pub supports_binary: bool,
}

impl RouteMetadata {
    /// Check that the metadata is usable for registration.
    pub fn is_well_formed(&self) -> bool {
        !self.route_id.is_empty()
            && self
                .route_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !self.description.is_empty()
            && !self.tags.is_empty()
    }
}

/// Native messaging route handler trait.
///
/// # Example
/// ```ignore
/// struct ListRoute;
///
/// #[async_trait]
/// impl NativeMessagingRoute for ListRoute {
///     type Request = ListRequest;
///     type Response = Vec<serde_json::Value>;
///
///     fn metadata() -> RouteMetadata { /* ... */ }
///
///     async fn validate_request(_req: &Self::Request) -> NativeMessagingResult<()> {
///         Ok(())
///     }
///
///     async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
///     where
///         S: StoreProvider + Send + Sync,
///     {
///         Ok(state.list(&req.collection).await?)
///     }
/// }
/// ```
#[async_trait]
pub trait NativeMessagingRoute: Send + Sync + 'static {
    /// Request type, deserialized from the message payload
    type Request: DeserializeOwned + Debug + Send + Sync;

    /// Response type, serialized into the envelope's `data`
    type Response: Serialize + Debug + Send + Sync;

    /// Describe the route.
    fn metadata() -> RouteMetadata;

    /// Reject malformed requests before the store is touched.
    ///
    /// Return `NativeMessagingError::ValidationError` for failures.
    async fn validate_request(req: &Self::Request) -> NativeMessagingResult<()>;

    /// Run the operation.
    ///
    /// Store failures propagate with `?` and are shaped by the router.
    async fn handle<S>(req: Self::Request, state: &S) -> NativeMessagingResult<Self::Response>
    where
        S: StoreProvider + Send + Sync;
}

/// Request type for routes that take no arguments.
///
/// Accepts a missing payload, `null` or `{}`; any field is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmptyRequest;

impl<'de> Deserialize<'de> for EmptyRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Empty {}

        Option::<Empty>::deserialize(deserializer).map(|_| EmptyRequest)
    }
}
