//! # wslink client
//!
//! Entry point for applications: starts a connection actor from
//! configuration, connects it, and hands back a [`LinkHandle`].
//!
//! Events (`Open`, `Err`, `Close`, `Pong`, `Message`) are delivered to any
//! actix `Recipient<ConnectionEvent>` registered through the handle. A
//! connection that dies, whether the peer closed it or the heartbeat gave up,
//! stays down until the caller connects again.

// Re-export the types users need alongside the handle
pub use wslink_core::{Config, ConnectionConfig, CoreError, load_config};
pub use wslink_transport::{
    ConnectParams, ConnectionEvent, ConnectionState, EventKind, Payload, TransportError,
};

mod error;
mod handle;
pub mod launch;

pub use error::ClientError;
pub use handle::LinkHandle;
pub use launch::{LinkTarget, launch};
