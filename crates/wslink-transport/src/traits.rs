use crate::error::TransportError;
use crate::types::{ConnectParams, Payload, ReadyState, TransportEvent};
use actix::prelude::*;

/// Identifies one session (one opened transport handle) of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A transport signal tagged with the session that produced it.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SessionSignal {
    pub session: SessionId,
    pub event: TransportEvent,
}

/// Where a transport reports the signals of the session it opened.
#[derive(Clone)]
pub struct SignalSink {
    session: SessionId,
    recipient: Recipient<SessionSignal>,
}

impl SignalSink {
    pub fn new(session: SessionId, recipient: Recipient<SessionSignal>) -> Self {
        Self { session, recipient }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Delivers `event`, queueing it regardless of mailbox capacity.
    /// Returns `false` once the receiving side is gone, which tells the
    /// transport nobody is listening anymore.
    pub fn emit(&self, event: TransportEvent) -> bool {
        if !self.recipient.connected() {
            return false;
        }
        self.recipient.do_send(SessionSignal {
            session: self.session,
            event,
        });
        true
    }
}

impl std::fmt::Debug for SignalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSink")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// A message-oriented duplex transport able to open sessions.
///
/// `open` starts the session and returns immediately; progress (open, error,
/// close, pong, inbound messages) is reported through `sink` in the order the
/// transport observes it. An `Err` means the session could not be started at
/// all, e.g. because the URL is malformed.
pub trait Transport: Send + Unpin + 'static {
    fn open(
        &self,
        params: &ConnectParams,
        sink: SignalSink,
    ) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// Control surface of one opened session.
///
/// Every call is non-blocking and infallible; failures surface later as
/// `TransportEvent::Error` / `TransportEvent::Close` signals.
pub trait TransportHandle: Send + Unpin {
    fn ready_state(&self) -> ReadyState;

    fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    fn send(&self, payload: Payload);

    /// Sends a ping frame; the peer's answer arrives as `TransportEvent::Pong`.
    fn ping(&self);

    fn close(&self);
}
