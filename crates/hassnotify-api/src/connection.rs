// ── Single connection lifecycle ──
//
// Dial, the auth handshake, and the standing event subscription. These
// run on the unsplit stream before the reader task takes the read half.

use std::future::Future;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message, protocol::WebSocketConfig};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;
use crate::messages::{
    self, AuthRequest, Envelope, SubscribeEventsRequest, TYPE_AUTH_INVALID, TYPE_AUTH_OK,
    TYPE_AUTH_REQUIRED,
};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Run `fut`, mapping an elapsed deadline to [`Error::Timeout`].
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout {
            timeout_secs: limit.as_secs(),
        })?
}

/// Open the WebSocket with the configured incoming-message limit.
pub(crate) async fn dial(url: &Url, max_message_size: usize) -> Result<WsStream, Error> {
    tracing::info!(url = %url, "Connecting to Home Assistant");

    let config = WebSocketConfig::default().max_message_size(Some(max_message_size));
    let (ws, _response) =
        tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), false)
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::debug!("WebSocket connected");
    Ok(ws)
}

/// `auth_required` → `auth` → `auth_ok`. Any deviation fails the attempt.
pub(crate) async fn authenticate(ws: &mut WsStream, token: &SecretString) -> Result<(), Error> {
    let hello = read_envelope(ws).await?;
    if hello.kind != TYPE_AUTH_REQUIRED {
        return Err(Error::UnexpectedMessage {
            expected: TYPE_AUTH_REQUIRED,
            got: hello.kind,
        });
    }

    send_json(ws, &AuthRequest::new(token.expose_secret())).await?;

    let reply = read_envelope(ws).await?;
    match reply.kind.as_str() {
        TYPE_AUTH_OK => {
            tracing::debug!("authenticated");
            Ok(())
        }
        TYPE_AUTH_INVALID => Err(Error::InvalidAuth),
        _ => Err(Error::UnexpectedMessage {
            expected: TYPE_AUTH_OK,
            got: reply.kind,
        }),
    }
}

/// Issue the standing `subscribe_events` request under `id` and require
/// a successful result.
pub(crate) async fn subscribe_state_changes(ws: &mut WsStream, id: u64) -> Result<(), Error> {
    send_json(ws, &SubscribeEventsRequest::state_changed(id)).await?;

    let reply = read_envelope(ws).await?;
    if reply.success != Some(true) {
        return Err(Error::InvalidResponse);
    }

    tracing::debug!(subscription_id = id, "subscribed to state_changed events");
    Ok(())
}

pub(crate) async fn send_json<S, T>(sink: &mut S, msg: &T) -> Result<(), Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    T: Serialize,
{
    let text = messages::encode(msg)?;
    sink.send(Message::text(text)).await?;
    Ok(())
}

async fn read_envelope(ws: &mut WsStream) -> Result<Envelope, Error> {
    let text = read_text(ws).await?;
    messages::decode_envelope(&text)
}

/// Next text frame. Control frames are skipped; anything else that is
/// not text is a protocol error.
async fn read_text(ws: &mut WsStream) -> Result<String, Error> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => return Err(Error::WebSocketClosed),
            Some(Ok(_)) => return Err(Error::NonTextFrame),
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
