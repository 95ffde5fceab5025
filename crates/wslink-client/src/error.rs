//! Errors specific to the client entry points.

use actix::MailboxError;
use thiserror::Error;
use wslink_core::CoreError;
use wslink_transport::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration loading failed: {0}")]
    ConfigError(#[from] CoreError),

    #[error("Connection failed: {0}")]
    Transport(#[from] TransportError),

    /// The connection actor stopped before answering.
    #[error("Connection actor unavailable: {0}")]
    ActorGone(#[from] MailboxError),
}
