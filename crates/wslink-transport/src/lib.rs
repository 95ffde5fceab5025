//! # wslink transport
//!
//! This crate handles the persistent connection itself.
//!
//! It defines the `Transport` capability (open a session, then drive it
//! through a `TransportHandle` while it reports signals to a `SignalSink`),
//! a WebSocket implementation of it, and the `ConnectionActor` which owns
//! one session at a time, republishes its events, and keeps it alive with a
//! ping/pong heartbeat.

pub mod connection;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-export key items
pub use connection::{
    Close, Connect, ConnectionActor, ConnectionEvent, ConnectionState, EventKind, GetState,
    IsActive, SendPayload, Shutdown, Subscribe,
};
pub use error::TransportError;
pub use factory::create_transport;
pub use traits::{SessionId, SessionSignal, SignalSink, Transport, TransportHandle};
pub use types::{ConnectParams, Payload, ReadyState, SharedReadyState, TransportEvent};
#[cfg(feature = "websocket")]
pub use websocket::{ProxyTarget, WebSocketTransport};
