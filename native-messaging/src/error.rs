//! Error types and handling for native messaging.
//!
//! Every failure that reaches the boundary ends up as an [`ErrorResponse`]
//! inside a failure envelope; nothing is thrown across the wire.

use common::{ErrorKind, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for native messaging operations.
pub type NativeMessagingResult<T> = Result<T, NativeMessagingError>;

/// Error types for native messaging operations.
#[derive(Debug, thiserror::Error)]
pub enum NativeMessagingError {
    /// Protocol-level errors (bad framing, invalid JSON, oversized messages)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request validation errors
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// Field name that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Route not found or unsupported
    #[error("Route not found: {route}")]
    RouteNotFound {
        /// Route identifier that was not found
        route: String,
    },

    /// Failure reported by the document store
    #[error(transparent)]
    Store(StoreError),

    /// Internal error, including handler panics
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors on the host's stdin/stdout
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error payload carried by a failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error details and context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Request ID for tracing (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl NativeMessagingError {
    /// Create a protocol error.
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a validation error.
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a route not found error.
    pub fn route_not_found<S: Into<String>>(route: S) -> Self {
        Self::RouteNotFound {
            route: route.into(),
        }
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            Self::Store(e) => match e.kind() {
                ErrorKind::NotFound => "NOT_FOUND",
                ErrorKind::Io => "IO_ERROR",
                ErrorKind::Decode => "DECODE_ERROR",
                ErrorKind::Validation => "VALIDATION_ERROR",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// True for the expected "document does not exist" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Check if this error is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Protocol(_) | Self::ValidationError { .. } | Self::RouteNotFound { .. } => true,
            Self::Store(e) => matches!(e.kind(), ErrorKind::NotFound | ErrorKind::Validation),
            Self::Internal(_) | Self::Io(_) => false,
        }
    }

    /// Check if this error is a server error (5xx equivalent).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Emit one log line at the level this kind of failure deserves.
    ///
    /// Not-found is an ordinary branch outcome and stays at debug; caller
    /// mistakes are warnings; anything an operator has to fix is an error.
    pub fn log(&self, request_id: &str, route: &str) {
        if self.is_not_found() {
            tracing::debug!(request_id, route, error = %self, "Document not found");
        } else if self.is_client_error() {
            tracing::warn!(request_id, route, code = self.error_code(), error = %self, "Request rejected");
        } else {
            tracing::error!(request_id, route, code = self.error_code(), error = %self, "Request failed");
        }
    }
}

impl From<StoreError> for NativeMessagingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation { field, message } => Self::ValidationError { field, message },
            other => Self::Store(other),
        }
    }
}

impl From<NativeMessagingError> for ErrorResponse {
    fn from(error: NativeMessagingError) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            NativeMessagingError::ValidationError { field, message } => Some(serde_json::json!({
                "field": field,
                "validation_message": message
            })),
            NativeMessagingError::RouteNotFound { route } => Some(serde_json::json!({
                "route": route
            })),
            NativeMessagingError::Store(StoreError::NotFound { collection, id })
            | NativeMessagingError::Store(StoreError::Decode { collection, id, .. }) => {
                Some(serde_json::json!({
                    "collection": collection,
                    "id": id
                }))
            }
            NativeMessagingError::Store(StoreError::Io { path, .. }) => Some(serde_json::json!({
                "path": path.display().to_string()
            })),
            _ => None,
        };

        Self {
            code,
            message,
            details,
            request_id: None,
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
