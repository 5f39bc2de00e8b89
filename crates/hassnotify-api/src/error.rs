use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Top-level error type for the `hassnotify-api` crate.
///
/// Covers every failure mode of the hub connection: dialing, the auth
/// handshake, the standing event subscription, frame decoding, and
/// caller misuse after shutdown. `hassnotify-core` maps these into
/// domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The hub answered the auth request with `auth_invalid`.
    #[error("Invalid access token")]
    InvalidAuth,

    // ── Transport ───────────────────────────────────────────────────
    /// WebSocket dial failed (DNS, refused, TLS, upgrade rejected).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Read or write on an established WebSocket failed.
    #[error("WebSocket transport error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// The stream ended or the hub sent a close frame.
    #[error("WebSocket closed by hub")]
    WebSocketClosed,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A dial, handshake or write step exceeded its deadline.
    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Protocol ────────────────────────────────────────────────────
    /// A message of the wrong type arrived during the handshake.
    #[error("Unexpected message type '{got}' (expected {expected})")]
    UnexpectedMessage { expected: &'static str, got: String },

    /// A binary (or otherwise non-text) frame arrived where JSON text was required.
    #[error("Received unexpected non-text message")]
    NonTextFrame,

    /// The event subscription reply was missing `success: true`.
    #[error("Invalid response")]
    InvalidResponse,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// JSON serialization of an outbound message failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The client has been closed; no further commands are accepted.
    #[error("Client closed")]
    ClientClosed,
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl Error {
    /// Returns `true` if the hub rejected the access token.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, Self::InvalidAuth)
    }

    /// Returns `true` if this is a transport-level failure that a
    /// reconnect is expected to resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_)
                | Self::WebSocket(_)
                | Self::WebSocketClosed
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the client was already shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClientClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(Error::Timeout { timeout_secs: 30 }.is_transient());
        assert!(Error::WebSocketClosed.is_transient());
        assert!(!Error::InvalidAuth.is_transient());
        assert!(!Error::InvalidResponse.is_transient());
        assert!(!Error::ClientClosed.is_transient());
    }

    #[test]
    fn unexpected_message_display() {
        let err = Error::UnexpectedMessage {
            expected: "auth_required",
            got: "result".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected message type 'result' (expected auth_required)"
        );
    }
}
