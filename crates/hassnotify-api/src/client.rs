//! Connection actor for the Home Assistant WebSocket API.
//!
//! One background task owns the WebSocket end-to-end: it dials, runs the
//! auth handshake, issues the standing `state_changed` subscription, and
//! is the only writer to the socket. A reader task is spawned per live
//! connection and fans events out through the subscriber registry. When
//! the reader reports a dropped connection the owner reconnects after a
//! fixed delay, replaying the full handshake.
//!
//! ```text
//!   HassClient (Clone)      mpsc + oneshot        owner task
//!   ┌──────────────────┐  ───────────────▶  ┌─────────────────────────┐
//!   │ wait_ready()     │                    │ dial → auth → subscribe │
//!   │ call_service()   │  ◀───────────────  │ command ids, writes     │
//!   │ close()          │                    └───────────┬─────────────┘
//!   └──────────────────┘                       lost     │ spawn
//!   subscribe_state_changes()                ┌──────────▼─────────────┐
//!         │            Mutex<Registry>       │ reader task            │
//!         └────────────────◀─────────────────│ decode → fan-out       │
//!                                            └────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hassnotify_api::{ConnectOptions, HassClient, NotificationOptions};
//!
//! let url = "ws://homeassistant.local:8123/api/websocket".parse()?;
//! let client = HassClient::connect(ConnectOptions::new(url, token));
//!
//! let (mut events, unsubscribe) = client.subscribe_state_changes().await;
//! while let Some(change) = events.recv().await {
//!     println!("{} {} -> {}", change.entity_id, change.old_state, change.new_state);
//! }
//!
//! unsubscribe.unsubscribe().await;
//! client.close().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::connection::{self, WsStream, with_timeout};
use crate::error::Error;
use crate::messages::{self, CallService, NotificationOptions, TYPE_EVENT};
use crate::registry::{Registry, StateChangeStream, Unsubscribe};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512_000_000;

/// Ids 0 and 1 are never handed out; the first allocation goes to the
/// standing event subscription.
const FIRST_COMMAND_ID: u64 = 2;
const REQUEST_CHANNEL_SIZE: usize = 64;

// ── ConnectOptions ───────────────────────────────────────────────────

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// WebSocket endpoint, e.g. `ws://homeassistant.local:8123/api/websocket`.
    pub url: Url,

    /// Long-lived access token.
    pub token: SecretString,

    /// Bound on the dial and on the handshake of each attempt, and on
    /// every outbound write. Default: 30s.
    pub timeout: Duration,

    /// Fixed pause between failed attempts. Default: 1s.
    pub retry_delay: Duration,

    /// Largest incoming message accepted. Default: 512 MB.
    pub max_message_size: usize,
}

impl ConnectOptions {
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            timeout: DEFAULT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers. Only the owner task writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initial,
    Connecting,
    Ready,
    Closed,
}

// ── Requests (internal) ──────────────────────────────────────────────

/// Sent from a [`HassClient`] to the owner task. Only polled while Ready.
enum Request {
    Ready {
        reply: oneshot::Sender<()>,
    },
    Command {
        call: CallService,
        reply: oneshot::Sender<Result<u64, Error>>,
    },
}

// ── HassClient ───────────────────────────────────────────────────────

/// Handle to the connection actor.
///
/// Cheaply cloneable via `Arc<ClientInner>`. Dropping the last clone
/// shuts the actor down, but [`close`](Self::close) should be preferred
/// since it also waits for the teardown to finish.
#[derive(Clone)]
pub struct HassClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    requests: mpsc::Sender<Request>,
    registry: Registry,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl HassClient {
    /// Spawn the connection actor and return immediately.
    ///
    /// The first connection attempt happens in the background; use
    /// [`wait_ready`](Self::wait_ready) to block until the hub is usable.
    /// Must be called from within a Tokio runtime.
    pub fn connect(options: ConnectOptions) -> Self {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_SIZE);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Initial);
        let registry = Registry::default();
        let shutdown = CancellationToken::new();

        let actor = Actor {
            options,
            registry: registry.clone(),
            requests: request_rx,
            state: state_tx,
            shutdown: shutdown.clone(),
            next_id: FIRST_COMMAND_ID,
        };
        let task = tokio::spawn(actor.run());

        Self {
            inner: Arc::new(ClientInner {
                requests: request_tx,
                registry,
                state: state_rx,
                shutdown,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Wait until the connection is authenticated and subscribed.
    pub async fn wait_ready(&self) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .requests
            .send(Request::Ready { reply })
            .await
            .map_err(|_| Error::ClientClosed)?;
        rx.await.map_err(|_| Error::ClientClosed)
    }

    /// Issue an opaque `call_service` command.
    ///
    /// Blocks until the connection is Ready, then returns the command id
    /// it was written under. No result is read back from the hub.
    pub async fn call_service(&self, call: CallService) -> Result<u64, Error> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .requests
            .send(Request::Command { call, reply })
            .await
            .map_err(|_| Error::ClientClosed)?;
        rx.await.map_err(|_| Error::ClientClosed)?
    }

    /// Push a notification to a mobile-app device via `notify.mobile_app_<device>`.
    pub async fn send_notification(
        &self,
        device: &str,
        title: &str,
        body: &str,
        options: &NotificationOptions,
    ) -> Result<u64, Error> {
        let call = messages::notification(device, title, body, options)?;
        self.call_service(call).await
    }

    /// Register for every `state_changed` event from now on.
    ///
    /// Subscriptions survive reconnects. The stream ends on unsubscribe
    /// or when the client is closed.
    pub async fn subscribe_state_changes(&self) -> (StateChangeStream, Unsubscribe) {
        self.inner.registry.subscribe().await
    }

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// Shut the actor down and wait for it to finish.
    ///
    /// Cancels any in-flight connect attempt, closes the socket, ends all
    /// event streams, and fails pending and future commands with
    /// [`Error::ClientClosed`]. Calling it again is a no-op.
    pub async fn close(&self) {
        self.inner.shutdown.cancel();

        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "connection task ended abnormally");
            }
        }
    }
}

// ── Owner task ───────────────────────────────────────────────────────

struct Actor {
    options: ConnectOptions,
    registry: Registry,
    requests: mpsc::Receiver<Request>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    next_id: u64,
}

/// A connection that finished the handshake, split between owner and reader.
struct Live {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
    reader_cancel: CancellationToken,
    lost: oneshot::Receiver<Error>,
}

enum Served {
    Lost,
    Shutdown,
}

impl Actor {
    /// Main loop: connect → serve → on loss, back off → reconnect.
    async fn run(mut self) {
        while let Some(live) = self.connect_until_ready().await {
            match self.serve(live).await {
                Served::Shutdown => break,
                Served::Lost => {
                    self.set_state(ConnectionState::Connecting);
                    if !self.backoff().await {
                        break;
                    }
                }
            }
        }

        self.finish().await;
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Sleep for the fixed retry delay. Returns `false` if shutdown fired.
    async fn backoff(&self) -> bool {
        tracing::info!(
            delay_ms = u64::try_from(self.options.retry_delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(self.options.retry_delay) => true,
        }
    }

    /// Retry attempts until one reaches Ready, or return `None` on shutdown.
    async fn connect_until_ready(&mut self) -> Option<Live> {
        let shutdown = self.shutdown.clone();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.set_state(ConnectionState::Connecting);

            let result = tokio::select! {
                biased;
                () = shutdown.cancelled() => return None,
                result = self.establish() => result,
            };

            match result {
                Ok((ws, subscription_id)) => {
                    tracing::info!(attempt, subscription_id, "connected to Home Assistant");
                    return Some(self.go_live(ws, subscription_id));
                }
                Err(e) if e.is_auth_invalid() => {
                    tracing::error!(attempt, "Home Assistant rejected the access token");
                }
                Err(e) if e.is_transient() && attempt > 1 => {
                    tracing::debug!(error = %e, attempt, "still unable to connect");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "connection attempt failed");
                }
            }

            if !self.backoff().await {
                return None;
            }
        }
    }

    /// Dial, authenticate and subscribe on a fresh socket.
    async fn establish(&mut self) -> Result<(WsStream, u64), Error> {
        let limit = self.options.timeout;
        let mut ws = with_timeout(
            limit,
            connection::dial(&self.options.url, self.options.max_message_size),
        )
        .await?;

        let subscription_id = self.allocate_id();
        let token = &self.options.token;
        let handshake = async {
            connection::authenticate(&mut ws, token).await?;
            connection::subscribe_state_changes(&mut ws, subscription_id).await
        };

        match with_timeout(limit, handshake).await {
            Ok(()) => Ok((ws, subscription_id)),
            Err(e) => {
                let _ = with_timeout(limit, async {
                    ws.close(None).await.map_err(Error::from)
                })
                .await;
                Err(e)
            }
        }
    }

    fn go_live(&mut self, ws: WsStream, subscription_id: u64) -> Live {
        let (sink, stream) = ws.split();
        let reader_cancel = self.shutdown.child_token();
        let (lost_tx, lost) = oneshot::channel();

        let reader = tokio::spawn(read_loop(
            stream,
            subscription_id,
            self.registry.clone(),
            reader_cancel.clone(),
            lost_tx,
        ));

        self.set_state(ConnectionState::Ready);

        Live {
            sink,
            reader,
            reader_cancel,
            lost,
        }
    }

    /// Serve callers until the connection drops or shutdown is requested.
    async fn serve(&mut self, mut live: Live) -> Served {
        let shutdown = self.shutdown.clone();

        let outcome = loop {
            tokio::select! {
                () = shutdown.cancelled() => break Served::Shutdown,

                reason = &mut live.lost => {
                    match reason {
                        Ok(e) => tracing::warn!(error = %e, "connection lost, reconnecting"),
                        Err(_) => tracing::warn!("reader task vanished, reconnecting"),
                    }
                    break Served::Lost;
                }

                request = self.requests.recv() => match request {
                    // Every handle is gone.
                    None => break Served::Shutdown,

                    Some(Request::Ready { reply }) => {
                        let _ = reply.send(());
                    }

                    Some(Request::Command { call, reply }) => {
                        if reply.is_closed() {
                            tracing::debug!(service = %call.service, "caller gave up, dropping command");
                            continue;
                        }
                        let id = self.allocate_id();
                        let result = self.write_command(&mut live.sink, &call, id).await;
                        let failed = result.is_err();
                        if let Err(ref e) = result {
                            tracing::warn!(error = %e, id, "command write failed");
                        }
                        let _ = reply.send(result.map(|()| id));
                        if failed {
                            break Served::Lost;
                        }
                    }
                },
            }
        };

        self.teardown(live).await;
        outcome
    }

    async fn write_command(
        &self,
        sink: &mut SplitSink<WsStream, Message>,
        call: &CallService,
        id: u64,
    ) -> Result<(), Error> {
        tracing::debug!(id, domain = %call.domain, service = %call.service, "calling service");
        with_timeout(
            self.options.timeout,
            connection::send_json(sink, &call.with_id(id)),
        )
        .await
    }

    /// Stop the reader and close the socket of a connection being left.
    async fn teardown(&self, live: Live) {
        let Live {
            mut sink,
            reader,
            reader_cancel,
            lost: _,
        } = live;

        reader_cancel.cancel();
        if let Err(e) = reader.await {
            tracing::warn!(error = %e, "reader task ended abnormally");
        }

        let closed = with_timeout(self.options.timeout, async {
            sink.close().await.map_err(Error::from)
        })
        .await;
        if let Err(e) = closed {
            tracing::debug!(error = %e, "error closing WebSocket");
        }
    }

    /// Enter the terminal state: end every event stream and refuse callers.
    async fn finish(mut self) {
        self.set_state(ConnectionState::Closed);
        self.registry.close_all().await;
        self.requests.close();
        tracing::info!("connection closed");
    }
}

// ── Reader task ──────────────────────────────────────────────────────

/// Read frames until the connection fails, dispatching events.
///
/// Reports the failure through `lost`; exits silently when cancelled.
async fn read_loop(
    mut stream: SplitStream<WsStream>,
    subscription_id: u64,
    registry: Registry,
    cancel: CancellationToken,
    lost: oneshot::Sender<Error>,
) {
    let reason = loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    () = dispatch(text.as_str(), subscription_id, &registry) => {}
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                tracing::trace!("WebSocket ping/pong");
            }
            Some(Ok(Message::Close(frame))) => {
                if let Some(ref cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "close frame received");
                }
                break Error::WebSocketClosed;
            }
            Some(Ok(_)) => break Error::NonTextFrame,
            Some(Err(e)) => break Error::from(e),
            None => break Error::WebSocketClosed,
        }
    };

    tracing::debug!(error = %reason, "reader exiting");
    let _ = lost.send(reason);
}

/// Decode one text frame and fan it out if it is a subscribed event.
async fn dispatch(text: &str, subscription_id: u64, registry: &Registry) {
    let envelope = match messages::decode_envelope(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed frame");
            return;
        }
    };

    if envelope.id != subscription_id {
        tracing::trace!(id = envelope.id, kind = %envelope.kind, "ignoring uncorrelated frame");
        return;
    }

    if envelope.kind != TYPE_EVENT {
        tracing::warn!(kind = %envelope.kind, "unexpected message type on event subscription");
        return;
    }

    match messages::decode_state_change(text) {
        Ok(change) => {
            let delivered = registry.deliver(&change).await;
            tracing::debug!(
                entity_id = %change.entity_id,
                old_state = %change.old_state,
                new_state = %change.new_state,
                delivered,
                "state change"
            );
        }
        Err(e) => tracing::warn!(error = %e, "failed to read event message"),
    }
}
