//! Docstore Native Messaging Crate
//!
//! Browser extension boundary for the embedded document store.
//!
//! # Architecture
//!
//! - Length-prefixed JSON frames on stdin/stdout ([`NativeMessagingProtocol`])
//! - Typed routes registered in a [`MessageRouter`], one per store operation
//! - Every reply is an envelope `{request_id, ok, data | error}`
//! - Requests run concurrently; a single writer task owns the output stream
//!
//! # Usage
//!
//! ```rust,no_run
//! use docstore_native_messaging::{run_host, NativeMessagingConfig};
//! use storage::DocumentStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = NativeMessagingConfig::default();
//!     let store = DocumentStore::open(config.store.to_store_config()).await?;
//!     run_host(store, config).await
//! }
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod error;
mod protocol;
mod router;
mod traits;
pub mod route_trait;
pub mod routes;

// Re-export public API
pub use config::{
    NativeMessagingConfig, StoreSection, DEFAULT_MAX_MESSAGE_SIZE, HARD_MAX_MESSAGE_SIZE,
};
pub use error::{ErrorResponse, NativeMessagingError, NativeMessagingResult};
pub use protocol::{IncomingMessage, NativeMessagingProtocol, OutgoingMessage, UNKNOWN_REQUEST_ID};
pub use router::{ConcreteRouteDispatcher, MessageRouter, RouteDispatcher};
pub use traits::StoreProvider;

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Native messaging host for browser extensions.
pub struct NativeMessagingHost {
    router: Arc<MessageRouter>,
    protocol: NativeMessagingProtocol,
}

impl NativeMessagingHost {
    /// Create a new native messaging host with every route registered.
    pub fn new(state: Arc<dyn StoreProvider>, config: NativeMessagingConfig) -> Self {
        let mut router = MessageRouter::new(state).with_request_logging(config.enable_logging);
        router.register_all_routes();
        let protocol = NativeMessagingProtocol::new(&config);

        Self {
            router: Arc::new(router),
            protocol,
        }
    }

    /// Process a single message.
    pub async fn process_message(&self, message: IncomingMessage) -> OutgoingMessage {
        self.router.dispatch(message).await
    }

    /// Access the router, mostly for route discovery.
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Serve frames from `reader` until end of input.
    ///
    /// Each request is handled on its own task, so replies may come back in
    /// a different order than requests arrived. Responses are funnelled
    /// through one writer task, which keeps frames from interleaving. On end
    /// of input every in-flight request is answered before returning.
    ///
    /// Malformed or oversized frames are answered with a failure envelope
    /// and the loop keeps going. A truncated stream or a broken output pipe
    /// ends it with an error.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutgoingMessage>();

        let protocol = self.protocol.clone();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                if let Err(e) = protocol.write_message(&mut writer, &response).await {
                    tracing::error!(
                        request_id = %response.request_id,
                        error = %e,
                        "Failed to send response"
                    );
                    return Err(e);
                }
            }
            Ok(())
        });

        let mut read_error = None;

        loop {
            if tx.is_closed() {
                tracing::warn!("Response writer stopped; no longer reading requests");
                break;
            }

            match self.protocol.read_frame(&mut reader).await {
                Ok(Some(frame)) => match self.protocol.parse_message(&frame) {
                    Ok(message) => {
                        tracing::debug!(
                            request_id = %message.request_id,
                            route = %message.route,
                            "Processing native messaging request"
                        );

                        let router = Arc::clone(&self.router);
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let response = router.dispatch(message).await;
                            let _ = tx.send(response);
                        });
                    }
                    Err(e) => {
                        let request_id = NativeMessagingProtocol::salvage_request_id(&frame);
                        e.log(&request_id, "");
                        let _ = tx.send(OutgoingMessage::from_error(request_id, e));
                    }
                },
                Ok(None) => {
                    tracing::info!("Input closed; draining in-flight requests");
                    break;
                }
                Err(e @ NativeMessagingError::Protocol(_)) => {
                    e.log(UNKNOWN_REQUEST_ID, "");
                    let _ = tx.send(OutgoingMessage::from_error(UNKNOWN_REQUEST_ID.to_string(), e));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read message; stopping");
                    read_error = Some(e);
                    break;
                }
            }
        }

        // The writer finishes once every spawned request has dropped its sender.
        drop(tx);
        writer_task.await??;

        match read_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Run the main message processing loop over stdin/stdout.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            routes = self.router.route_count(),
            max_message_size = self.protocol.max_message_size(),
            "Native messaging host starting message loop"
        );

        self.serve(tokio::io::stdin(), tokio::io::stdout()).await?;

        tracing::info!("Native messaging host stopped");
        Ok(())
    }
}

/// Run the native messaging host.
///
/// This is the main entry point for starting the host that talks to the
/// extension over stdin/stdout. It returns once the extension closes stdin.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or stdin/stdout fail.
pub async fn run_host<S>(state: S, config: NativeMessagingConfig) -> anyhow::Result<()>
where
    S: StoreProvider,
{
    run_host_with_state(Arc::new(state) as Arc<dyn StoreProvider>, config).await
}

/// Run the native messaging host with a shared store handle.
pub async fn run_host_with_state(
    state: Arc<dyn StoreProvider>,
    config: NativeMessagingConfig,
) -> anyhow::Result<()> {
    config.validate()?;
    let host = NativeMessagingHost::new(state, config);
    host.run().await
}
