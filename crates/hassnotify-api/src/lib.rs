// hassnotify-api: Resilient Home Assistant WebSocket client (auth, events, notify)

pub mod client;
mod connection;
pub mod error;
pub mod messages;
mod registry;

pub use client::{ConnectOptions, ConnectionState, HassClient};
pub use error::Error;
pub use messages::{CallService, NotificationOptions, StateChange};
pub use registry::{StateChangeStream, Unsubscribe};
