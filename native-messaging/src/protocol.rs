//! Browser native messaging protocol implementation.
//!
//! Each message is a 4-byte little-endian length header followed by that
//! many bytes of UTF-8 JSON. Reading and writing are generic over tokio's
//! async I/O traits so the host runs on stdin/stdout in production and on
//! in-memory pipes in tests.

use crate::config::{NativeMessagingConfig, HARD_MAX_MESSAGE_SIZE};
use crate::error::{ErrorResponse, NativeMessagingError, NativeMessagingResult};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Request ID used when a frame is too broken to carry one.
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Incoming message from the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Route identifier (e.g., "write", "read", "search")
    pub route: String,

    /// Client-generated request ID for correlation
    pub request_id: String,

    /// Route-specific request payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Outgoing response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Echo back the client request ID
    pub request_id: String,

    /// Indicates success or failure
    pub ok: bool,

    /// Response data (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error details (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Native messaging frame codec.
#[derive(Debug, Clone)]
pub struct NativeMessagingProtocol {
    max_message_size: usize,
}

impl NativeMessagingProtocol {
    /// Create a new protocol handler.
    pub fn new(config: &NativeMessagingConfig) -> Self {
        Self {
            max_message_size: config.max_message_size.min(HARD_MAX_MESSAGE_SIZE),
        }
    }

    /// Largest frame this codec accepts or emits.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Read one raw frame.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - A complete frame body
    /// * `Ok(None)` - The peer closed the stream between frames
    /// * `Err(Protocol)` - The frame was rejected but the stream is still in
    ///   sync; the caller may keep reading
    /// * `Err(Io)` - The stream is broken; the caller must stop
    pub async fn read_frame<R>(&self, reader: &mut R) -> NativeMessagingResult<Option<Vec<u8>>>
    where
        R: AsyncRead + Unpin,
    {
        let mut length_bytes = [0u8; 4];
        match reader.read_exact(&mut length_bytes).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let message_length = u32::from_le_bytes(length_bytes) as usize;

        if message_length == 0 {
            return Err(NativeMessagingError::protocol("Message length cannot be zero"));
        }

        if message_length > self.max_message_size {
            if message_length > HARD_MAX_MESSAGE_SIZE {
                // Cannot trust the header enough to skip the body
                return Err(NativeMessagingError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("frame header announces {} bytes", message_length),
                )));
            }

            let skipped =
                tokio::io::copy(&mut (&mut *reader).take(message_length as u64), &mut tokio::io::sink())
                    .await?;
            if skipped < message_length as u64 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            return Err(NativeMessagingError::protocol(format!(
                "Message length {} exceeds maximum size {}",
                message_length, self.max_message_size
            )));
        }

        let mut message_bytes = vec![0u8; message_length];
        reader.read_exact(&mut message_bytes).await?;
        Ok(Some(message_bytes))
    }

    /// Parse and validate a frame body.
    pub fn parse_message(&self, data: &[u8]) -> NativeMessagingResult<IncomingMessage> {
        let message_str = std::str::from_utf8(data)
            .map_err(|e| NativeMessagingError::protocol(format!("Invalid UTF-8 in message: {}", e)))?;

        let message: IncomingMessage = serde_json::from_str(message_str)
            .map_err(|e| NativeMessagingError::protocol(format!("Invalid JSON in message: {}", e)))?;

        validate_incoming_message(&message)?;
        Ok(message)
    }

    /// Best-effort request ID from a frame that failed to parse.
    pub fn salvage_request_id(data: &[u8]) -> String {
        serde_json::from_slice::<serde_json::Value>(data)
            .ok()
            .and_then(|v| v.get("request_id").and_then(|id| id.as_str()).map(str::to_string))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| UNKNOWN_REQUEST_ID.to_string())
    }

    /// Serialize a message into a complete frame.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the encoded message exceeds the maximum
    /// frame size.
    pub fn encode_frame(&self, message: &OutgoingMessage) -> NativeMessagingResult<Vec<u8>> {
        let json = serde_json::to_vec(message).map_err(|e| {
            NativeMessagingError::internal(format!("Failed to serialize response: {}", e))
        })?;

        if json.len() > self.max_message_size {
            return Err(NativeMessagingError::protocol(format!(
                "Response message length {} exceeds maximum size {}",
                json.len(),
                self.max_message_size
            )));
        }

        let mut frame = Vec::with_capacity(4 + json.len());
        frame.extend_from_slice(&(json.len() as u32).to_le_bytes());
        frame.extend_from_slice(&json);
        Ok(frame)
    }

    /// Write a message and flush it.
    ///
    /// An oversized response is replaced by a failure envelope for the same
    /// request so the caller is never left waiting.
    pub async fn write_message<W>(
        &self,
        writer: &mut W,
        message: &OutgoingMessage,
    ) -> NativeMessagingResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = match self.encode_frame(message) {
            Ok(frame) => frame,
            Err(e @ NativeMessagingError::Protocol(_)) => {
                tracing::warn!(request_id = %message.request_id, error = %e, "Response too large");
                let mut error: ErrorResponse = e.into();
                error.request_id = Some(message.request_id.clone());
                self.encode_frame(&OutgoingMessage::error(message.request_id.clone(), error))?
            }
            Err(e) => return Err(e),
        };

        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Validate incoming message structure.
fn validate_incoming_message(message: &IncomingMessage) -> NativeMessagingResult<()> {
    if message.route.is_empty() {
        return Err(NativeMessagingError::validation("route", "Route cannot be empty"));
    }

    if message.request_id.is_empty() {
        return Err(NativeMessagingError::validation("request_id", "Request ID cannot be empty"));
    }

    if !message
        .route
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(NativeMessagingError::validation(
            "route",
            "Route must contain only alphanumeric characters, underscores, and hyphens",
        ));
    }

    Ok(())
}

impl OutgoingMessage {
    /// Create a success response.
    pub fn success(request_id: String, data: serde_json::Value) -> Self {
        Self {
            request_id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(request_id: String, error: ErrorResponse) -> Self {
        Self {
            request_id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// Failure envelope built straight from an error.
    pub fn from_error(request_id: String, error: NativeMessagingError) -> Self {
        let mut response: ErrorResponse = error.into();
        response.request_id = Some(request_id.clone());
        Self::error(request_id, response)
    }
}
