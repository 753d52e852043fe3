//! Message routing and dispatch system.
//!
//! The router is the single place where failures become envelopes. Handler
//! errors, malformed payloads, unknown routes and handler panics all come
//! back as `ok: false` responses; dispatch itself never fails.

use crate::{
    error::{NativeMessagingError, NativeMessagingResult},
    protocol::{IncomingMessage, OutgoingMessage},
    route_trait::{NativeMessagingRoute, RouteMetadata},
    traits::StoreProvider,
};
use async_trait::async_trait;
use futures::FutureExt;
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};
use tracing::Instrument;

/// Type-erased route dispatcher trait.
///
/// This trait allows storing different route types in a single collection
/// while maintaining type safety for request/response handling.
#[async_trait]
pub trait RouteDispatcher: Send + Sync {
    /// Deserialize, validate and handle one payload.
    async fn dispatch(
        &self,
        payload: serde_json::Value,
        state: &Arc<dyn StoreProvider>,
    ) -> NativeMessagingResult<serde_json::Value>;

    /// Get route metadata.
    fn metadata(&self) -> RouteMetadata;
}

/// Concrete route dispatcher implementation.
pub struct ConcreteRouteDispatcher<R: NativeMessagingRoute> {
    _phantom: std::marker::PhantomData<R>,
}

impl<R: NativeMessagingRoute> ConcreteRouteDispatcher<R> {
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<R: NativeMessagingRoute> Default for ConcreteRouteDispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: NativeMessagingRoute> RouteDispatcher for ConcreteRouteDispatcher<R> {
    async fn dispatch(
        &self,
        payload: serde_json::Value,
        state: &Arc<dyn StoreProvider>,
    ) -> NativeMessagingResult<serde_json::Value> {
        let request: R::Request = serde_json::from_value(payload).map_err(|e| {
            NativeMessagingError::validation("payload", format!("Invalid request format: {}", e))
        })?;

        R::validate_request(&request).await?;

        let response = R::handle(request, state).await?;

        serde_json::to_value(response).map_err(|e| {
            NativeMessagingError::internal(format!("Failed to serialize response: {}", e))
        })
    }

    fn metadata(&self) -> RouteMetadata {
        R::metadata()
    }
}

/// Message router that dispatches requests to appropriate handlers.
pub struct MessageRouter {
    routes: HashMap<String, Box<dyn RouteDispatcher>>,
    state: Arc<dyn StoreProvider>,
    log_requests: bool,
}

impl MessageRouter {
    /// Create a new message router with no routes.
    pub fn new(state: Arc<dyn StoreProvider>) -> Self {
        Self {
            routes: HashMap::new(),
            state,
            log_requests: true,
        }
    }

    /// Toggle per-request info logging. Failures are always logged.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Register a route handler.
    pub fn register_route<R: NativeMessagingRoute>(&mut self) {
        self.register_dispatcher(Box::new(ConcreteRouteDispatcher::<R>::new()));
    }

    /// Register a type-erased dispatcher.
    pub fn register_dispatcher(&mut self, dispatcher: Box<dyn RouteDispatcher>) {
        let metadata = dispatcher.metadata();

        tracing::debug!(
            route_id = metadata.route_id,
            description = metadata.description,
            "Registering route handler"
        );

        self.routes.insert(metadata.route_id.to_string(), dispatcher);
    }

    /// Register every document store route.
    pub fn register_all_routes(&mut self) {
        use crate::routes::{collections, documents, system};

        self.register_route::<system::InitRoute>();
        self.register_route::<system::GetPathRoute>();

        self.register_route::<documents::WriteRoute>();
        self.register_route::<documents::AddRoute>();
        self.register_route::<documents::ReadRoute>();
        self.register_route::<documents::DeleteRoute>();
        self.register_route::<documents::ExistsRoute>();

        self.register_route::<collections::ListRoute>();
        self.register_route::<collections::SearchRoute>();

        tracing::info!(route_count = self.routes.len(), "Routes registered");
    }

    /// Dispatch an incoming message and shape the outcome into an envelope.
    pub async fn dispatch(&self, message: IncomingMessage) -> OutgoingMessage {
        let IncomingMessage {
            route,
            request_id,
            payload,
        } = message;

        let span = tracing::info_span!("request", request_id = %request_id, route = %route);
        let result = self.dispatch_inner(&route, payload).instrument(span).await;

        match result {
            Ok(data) => {
                if self.log_requests {
                    tracing::info!(request_id = %request_id, route = %route, "Request succeeded");
                }
                OutgoingMessage::success(request_id, data)
            }
            Err(e) => {
                e.log(&request_id, &route);
                OutgoingMessage::from_error(request_id, e)
            }
        }
    }

    async fn dispatch_inner(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> NativeMessagingResult<serde_json::Value> {
        let dispatcher = self
            .routes
            .get(route)
            .ok_or_else(|| NativeMessagingError::route_not_found(route))?;

        if self.log_requests {
            tracing::debug!("Dispatching to route handler");
        }

        match AssertUnwindSafe(dispatcher.dispatch(payload, &self.state))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(NativeMessagingError::internal(format!(
                    "handler panicked: {}",
                    detail
                )))
            }
        }
    }

    /// Get all registered routes metadata.
    pub fn get_routes(&self) -> Vec<RouteMetadata> {
        self.routes
            .values()
            .map(|dispatcher| dispatcher.metadata())
            .collect()
    }

    /// Get route count.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Check if a route is registered.
    pub fn has_route(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }
}
