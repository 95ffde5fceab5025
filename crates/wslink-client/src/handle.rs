use crate::error::ClientError;
use actix::prelude::*;
use wslink_transport::{
    Close, Connect, ConnectParams, ConnectionActor, ConnectionEvent, ConnectionState, EventKind,
    GetState, IsActive, Payload, SendPayload, Shutdown, Subscribe,
};

/// Cloneable handle to a running `ConnectionActor`.
#[derive(Clone)]
pub struct LinkHandle {
    addr: Addr<ConnectionActor>,
    url: String,
}

impl LinkHandle {
    /// Starts a connection actor for `params` without connecting it.
    pub fn start(params: ConnectParams) -> Result<Self, ClientError> {
        let url = params.url.clone();
        let addr = ConnectionActor::from_params(params)?.start();
        Ok(Self { addr, url })
    }

    pub fn from_addr(addr: Addr<ConnectionActor>, url: impl Into<String>) -> Self {
        Self {
            addr,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Opens a session unless one is already open. See [`Connect`].
    pub async fn connect(&self) -> Result<(), ClientError> {
        Ok(self.addr.send(Connect).await??)
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        Ok(self.addr.send(Close).await?)
    }

    /// Closes the session and stops the actor. Later calls fail with
    /// `ClientError::ActorGone`.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        Ok(self.addr.send(Shutdown).await?)
    }

    /// Queues `payload` for the transport; dropped silently while closing.
    pub fn send(&self, payload: impl Into<Payload>) {
        self.addr.do_send(SendPayload(payload.into()));
    }

    pub async fn is_active(&self) -> Result<bool, ClientError> {
        Ok(self.addr.send(IsActive).await?)
    }

    pub async fn state(&self) -> Result<ConnectionState, ClientError> {
        Ok(self.addr.send(GetState).await?)
    }

    pub async fn subscribe(&self, recipient: Recipient<ConnectionEvent>) -> Result<(), ClientError> {
        Ok(self.addr.send(Subscribe::all(recipient)).await?)
    }

    pub async fn subscribe_to(
        &self,
        kinds: impl IntoIterator<Item = EventKind>,
        recipient: Recipient<ConnectionEvent>,
    ) -> Result<(), ClientError> {
        Ok(self.addr.send(Subscribe::to(kinds, recipient)).await?)
    }
}

impl std::fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHandle").field("url", &self.url).finish()
    }
}
