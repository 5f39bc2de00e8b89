// ── Core error types ──
//
// User-facing errors from hassnotify-core. Consumers never see WebSocket
// frames or JSON parse failures directly; the `From<hassnotify_api::Error>`
// impl translates them into domain-appropriate variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Home Assistant: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Home Assistant connection closed")]
    Disconnected,

    #[error("Home Assistant connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hassnotify_api::Error> for CoreError {
    fn from(err: hassnotify_api::Error) -> Self {
        use hassnotify_api::Error as Api;

        match err {
            Api::InvalidAuth => CoreError::AuthenticationFailed {
                message: "Home Assistant rejected the access token".into(),
            },
            Api::WebSocketConnect(reason) => CoreError::ConnectionFailed { reason },
            Api::WebSocket(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::WebSocketClosed | Api::ClientClosed => CoreError::Disconnected,
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            e @ (Api::UnexpectedMessage { .. } | Api::NonTextFrame | Api::InvalidResponse) => {
                CoreError::Protocol {
                    message: e.to_string(),
                }
            }
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Api::Serialization(e) => CoreError::Internal(format!("Serialization error: {e}")),
        }
    }
}
