use crate::error::TransportError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use wslink_core::ConnectionConfig;
use wslink_core::config::{
    DEFAULT_ACTIVITY_TIMEOUT_MS, DEFAULT_CLOSE_TIMEOUT_MS, DEFAULT_PONG_TIMEOUT_MS,
};

/// Parameters required to establish and supervise a connection.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectParams {
    /// The full URL for the connection (e.g., "wss://stream.example.com/ws").
    /// The scheme determines the transport type.
    pub url: String,

    /// Transport-level agent override. For WebSockets this is an HTTP proxy
    /// URL the connection is tunnelled through.
    pub agent: Option<String>,

    /// Delay between the transport opening and the connection reporting ready.
    pub wait_after_connect: Option<Duration>,

    /// Enables diagnostic logging of pings and raw inbound payloads.
    pub verbose: bool,

    pub activity_timeout: Duration,
    pub pong_timeout: Duration,

    /// Bound on the close handshake; after it the socket is dropped and the
    /// transport reports `Close` anyway.
    pub close_timeout: Duration,
}

impl ConnectParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: None,
            wait_after_connect: None,
            verbose: false,
            activity_timeout: Duration::from_millis(DEFAULT_ACTIVITY_TIMEOUT_MS),
            pong_timeout: Duration::from_millis(DEFAULT_PONG_TIMEOUT_MS),
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS),
        }
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn wait_after_connect(mut self, delay: Duration) -> Self {
        self.wait_after_connect = Some(delay);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout = timeout;
        self
    }

    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

impl TryFrom<&ConnectionConfig> for ConnectParams {
    type Error = wslink_core::CoreError;

    fn try_from(cfg: &ConnectionConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            url: cfg.endpoint()?.to_string(),
            agent: cfg.agent.clone(),
            wait_after_connect: cfg.wait_after_connect_ms.map(Duration::from_millis),
            verbose: cfg.verbose,
            activity_timeout: Duration::from_millis(cfg.activity_timeout_ms),
            pong_timeout: Duration::from_millis(cfg.pong_timeout_ms),
            close_timeout: Duration::from_millis(cfg.close_timeout_ms),
        })
    }
}

/// A message body, forwarded unmodified in both directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Text(text) => f.write_str(text),
            Payload::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

/// Lifecycle of a transport handle, using the WebSocket `readyState` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Ready state shared between a transport handle and the task driving it.
#[derive(Clone, Debug)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ReadyState::Connecting as u8)))
    }

    pub fn get(&self) -> ReadyState {
        ReadyState::from(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for SharedReadyState {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals a transport reports for one session.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Open,
    Error(TransportError),
    Close,
    Pong,
    Message(Payload),
}
