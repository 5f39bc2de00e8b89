//! Wire shapes for the Home Assistant WebSocket API.
//!
//! Every correlated message carries the common `{id, type, success?}`
//! [`Envelope`]. Outbound requests are plain `Serialize` structs; inbound
//! frames are decoded first as an envelope and then, when the envelope
//! marks a state-change event, as an [`EventMessage`].

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Message type tags ────────────────────────────────────────────────

pub const TYPE_AUTH_REQUIRED: &str = "auth_required";
pub const TYPE_AUTH: &str = "auth";
pub const TYPE_AUTH_OK: &str = "auth_ok";
pub const TYPE_AUTH_INVALID: &str = "auth_invalid";
pub const TYPE_SUBSCRIBE_EVENTS: &str = "subscribe_events";
pub const TYPE_CALL_SERVICE: &str = "call_service";
pub const TYPE_EVENT: &str = "event";

pub const EVENT_STATE_CHANGED: &str = "state_changed";
pub const NOTIFY_DOMAIN: &str = "notify";

// ── Envelope ─────────────────────────────────────────────────────────

/// The `{id, type, success?}` wrapper present on every correlated message.
///
/// Handshake messages carry no `id`; it decodes as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: u64,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

// ── Outbound ─────────────────────────────────────────────────────────

/// `{type: "auth", access_token}` -- the second step of the handshake.
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub access_token: &'a str,
}

impl<'a> AuthRequest<'a> {
    pub fn new(access_token: &'a str) -> Self {
        Self {
            kind: TYPE_AUTH,
            access_token,
        }
    }
}

/// The standing `subscribe_events` request for `state_changed` events.
#[derive(Debug, Serialize)]
pub struct SubscribeEventsRequest {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub event_type: &'static str,
}

impl SubscribeEventsRequest {
    pub fn state_changed(id: u64) -> Self {
        Self {
            id,
            kind: TYPE_SUBSCRIBE_EVENTS,
            event_type: EVENT_STATE_CHANGED,
        }
    }
}

/// An opaque service call. The actor stamps the command id at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallService {
    pub domain: String,
    pub service: String,
    pub service_data: serde_json::Value,
}

impl CallService {
    /// Attach a command id, producing the wire request.
    pub fn with_id(&self, id: u64) -> CallServiceRequest<'_> {
        CallServiceRequest {
            id,
            kind: TYPE_CALL_SERVICE,
            call: self,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CallServiceRequest<'a> {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub call: &'a CallService,
}

/// Platform options for a mobile-app push notification.
///
/// Empty fields are omitted from the wire message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
struct NotifyServiceData<'a> {
    title: &'a str,
    message: &'a str,
    data: &'a NotificationOptions,
}

/// Build the `notify.mobile_app_<device>` service call.
pub fn notification(
    device: &str,
    title: &str,
    body: &str,
    options: &NotificationOptions,
) -> Result<CallService, Error> {
    let service_data = serde_json::to_value(NotifyServiceData {
        title,
        message: body,
        data: options,
    })?;

    Ok(CallService {
        domain: NOTIFY_DOMAIN.into(),
        service: format!("mobile_app_{device}"),
        service_data,
    })
}

// ── Inbound ──────────────────────────────────────────────────────────

/// A decoded `state_changed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: String,
    pub old_state: String,
    pub new_state: String,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub event: EventBody,
}

#[derive(Debug, Deserialize)]
pub struct EventBody {
    pub data: EventData,
    #[serde(default)]
    pub event_type: String,
}

/// `old_state`/`new_state` are `null` when an entity is added or removed.
#[derive(Debug, Deserialize)]
pub struct EventData {
    pub entity_id: String,
    #[serde(default)]
    pub new_state: Option<EntityState>,
    #[serde(default)]
    pub old_state: Option<EntityState>,
}

#[derive(Debug, Deserialize)]
pub struct EntityState {
    pub state: String,
}

impl From<EventMessage> for StateChange {
    fn from(msg: EventMessage) -> Self {
        let data = msg.event.data;
        Self {
            entity_id: data.entity_id,
            old_state: data.old_state.map(|s| s.state).unwrap_or_default(),
            new_state: data.new_state.map(|s| s.state).unwrap_or_default(),
        }
    }
}

// ── Codec ────────────────────────────────────────────────────────────

/// Serialize an outbound message into a text frame payload.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, Error> {
    Ok(serde_json::to_string(msg)?)
}

pub fn decode_envelope(text: &str) -> Result<Envelope, Error> {
    decode(text)
}

pub fn decode_state_change(text: &str) -> Result<StateChange, Error> {
    decode::<EventMessage>(text).map(StateChange::from)
}

fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, Error> {
    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: text.to_owned(),
    })
}

// ── Tests ────────────────────────────────────────────────────────────
