use crate::error::TransportError;
use crate::factory::create_transport;
use crate::traits::{SessionId, SessionSignal, SignalSink, Transport, TransportHandle};
use crate::types::{ConnectParams, Payload, ReadyState, TransportEvent};
use actix::prelude::*;
use futures_channel::oneshot;
use log::{debug, error, info, trace, warn};
use std::time::Duration;

/// Actor owning one persistent connection.
///
/// It opens a fresh transport session on every `Connect` that finds no open
/// session, republishes the session's signals to subscribers, and runs the
/// heartbeat: after `activity_timeout` without a pong it pings the peer and,
/// if no pong arrives within `pong_timeout`, closes the transport itself.
/// Reconnecting after a failure is left to the caller.
pub struct ConnectionActor {
    params: ConnectParams,
    transport: Box<dyn Transport>,
    session: Option<Session>,
    next_session: u64,
    // At most one heartbeat callback is outstanding; always cancelled before re-arming.
    pending_timer: Option<SpawnHandle>,
    subscribers: Vec<Subscriber>,
}

/// One opened transport handle plus the bookkeeping tied to it.
struct Session {
    id: SessionId,
    handle: Option<Box<dyn TransportHandle>>,
    is_closing: bool,
    ready: bool,
    activity_timeout: Duration,
    pong_timeout: Duration,
    pending_connect: Option<oneshot::Sender<Result<(), TransportError>>>,
}

impl Session {
    fn new(
        id: SessionId,
        handle: Box<dyn TransportHandle>,
        params: &ConnectParams,
        pending_connect: oneshot::Sender<Result<(), TransportError>>,
    ) -> Self {
        Self {
            id,
            handle: Some(handle),
            is_closing: false,
            ready: false,
            activity_timeout: params.activity_timeout,
            pong_timeout: params.pong_timeout,
            pending_connect: Some(pending_connect),
        }
    }

    fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_open())
    }

    /// Completes the pending `Connect`, if any. Only the first call has effect.
    fn settle(&mut self, result: Result<(), TransportError>) {
        if let Some(tx) = self.pending_connect.take() {
            // The caller may have stopped waiting; nothing to do then.
            let _ = tx.send(result);
        }
    }
}

struct Subscriber {
    kinds: Option<Vec<EventKind>>,
    recipient: Recipient<ConnectionEvent>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

impl ConnectionActor {
    pub fn new(params: ConnectParams, transport: Box<dyn Transport>) -> Self {
        ConnectionActor {
            params,
            transport,
            session: None,
            next_session: 0,
            pending_timer: None,
            subscribers: Vec::new(),
        }
    }

    /// Builds the actor with the transport matching the endpoint's scheme.
    pub fn from_params(params: ConnectParams) -> Result<Self, TransportError> {
        let transport = create_transport(&params.url)?;
        Ok(Self::new(params, transport))
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_open)
    }

    fn state(&self) -> ConnectionState {
        let Some(session) = self.session.as_ref() else {
            return ConnectionState::Idle;
        };
        let Some(handle) = session.handle.as_ref() else {
            return ConnectionState::Closed;
        };
        match handle.ready_state() {
            ReadyState::Closed => ConnectionState::Closed,
            ReadyState::Closing => ConnectionState::Closing,
            _ if session.is_closing => ConnectionState::Closing,
            ReadyState::Open if session.ready => ConnectionState::Ready,
            _ => ConnectionState::Connecting,
        }
    }

    /// The current session, provided it is the one identified by `id`.
    fn current_session(&mut self, id: SessionId) -> Option<&mut Session> {
        match self.session.as_mut() {
            Some(session) if session.id == id => Some(session),
            _ => {
                trace!("Ignoring callback for superseded session {}", id);
                None
            }
        }
    }

    fn emit(&mut self, event: ConnectionEvent) {
        let kind = event.kind();
        self.subscribers.retain(|s| s.recipient.connected());
        for subscriber in self.subscribers.iter().filter(|s| s.wants(kind)) {
            subscriber.recipient.do_send(event.clone());
        }
    }

    fn cancel_pending_timer(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.pending_timer.take() {
            ctx.cancel_future(handle);
        }
    }

    /// Restarts the idle clock of the current session.
    fn reset_activity_check(&mut self, ctx: &mut Context<Self>) {
        self.cancel_pending_timer(ctx);
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.is_closing {
            return;
        }
        let (id, idle) = (session.id, session.activity_timeout);
        trace!("Heartbeat for session {} re-armed ({:?})", id, idle);
        self.pending_timer = Some(ctx.run_later(idle, move |act, ctx| {
            act.on_activity_timeout(id, ctx)
        }));
    }

    fn on_activity_timeout(&mut self, id: SessionId, ctx: &mut Context<Self>) {
        self.pending_timer = None;
        let Some(session) = self.current_session(id) else {
            return;
        };
        if session.is_closing || !session.is_open() {
            return;
        }
        if let Some(handle) = session.handle.as_ref() {
            handle.ping();
        }
        let pong_timeout = session.pong_timeout;
        if self.params.verbose {
            info!("Session {} idle, ping sent to {}", id, self.params.url);
        }
        self.pending_timer = Some(ctx.run_later(pong_timeout, move |act, _ctx| {
            act.on_pong_timeout(id)
        }));
    }

    fn on_pong_timeout(&mut self, id: SessionId) {
        self.pending_timer = None;
        let Some(session) = self.current_session(id) else {
            return;
        };
        if session.is_closing || !session.is_open() {
            return;
        }
        warn!(
            "No pong from session {} within {:?}, closing transport.",
            id, session.pong_timeout
        );
        // The flag stays unset so the transport's close signal reaches subscribers.
        if let Some(handle) = session.handle.as_ref() {
            handle.close();
        }
    }

    /// Second half of the open signal, after the optional post-connect wait.
    fn on_ready(&mut self, id: SessionId, ctx: &mut Context<Self>) {
        let Some(session) = self.current_session(id) else {
            return;
        };
        if session.is_closing {
            debug!("Session {} closed before it became ready", id);
            session.settle(Err(TransportError::Closing));
            return;
        }
        session.ready = true;
        info!("Connection ready ({}, session {})", self.params.url, id);
        self.emit(ConnectionEvent::Open);
        self.reset_activity_check(ctx);
        self.settle(id, Ok(()));
    }

    fn settle(&mut self, id: SessionId, result: Result<(), TransportError>) {
        if let Some(session) = self.current_session(id) {
            session.settle(result);
        }
    }

    /// Marks the current session closing and releases its transport handle.
    fn close_session(&mut self, ctx: &mut Context<Self>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(handle) = session.handle.take() {
            session.is_closing = true;
            info!("Closing session {} ({})", session.id, self.params.url);
            handle.close();
            self.cancel_pending_timer(ctx);
        }
    }

    /// Installs a new session, retiring whatever session it replaces.
    fn replace_session(&mut self, session: Session, ctx: &mut Context<Self>) {
        if let Some(mut old) = self.session.take() {
            if let Some(handle) = old.handle.take() {
                debug!("Session {} superseded by session {}", old.id, session.id);
                old.is_closing = true;
                handle.close();
            }
            old.settle(Err(TransportError::Superseded));
        }
        self.cancel_pending_timer(ctx);
        self.session = Some(session);
    }
}

/// Represents the lifecycle state of the connection managed by `ConnectionActor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session has been opened yet.
    Idle,
    Connecting,
    /// Open signal handled and heartbeat running.
    Ready,
    Closing,
    Closed,
}

/// Event republished to subscribers.
#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "()")]
pub enum ConnectionEvent {
    Open,
    Err(TransportError),
    Close,
    Pong,
    Message(Payload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Err,
    Close,
    Pong,
    Message,
}

impl ConnectionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ConnectionEvent::Open => EventKind::Open,
            ConnectionEvent::Err(_) => EventKind::Err,
            ConnectionEvent::Close => EventKind::Close,
            ConnectionEvent::Pong => EventKind::Pong,
            ConnectionEvent::Message(_) => EventKind::Message,
        }
    }
}

// --- Actor Messages ---

/// Opens a session unless one is already open.
///
/// Resolves on the first open, pong or message signal of the new session,
/// and fails on its first error or close signal.
#[derive(Message, Debug, Clone, Copy, Default)]
#[rtype(result = "Result<(), TransportError>")]
pub struct Connect;

/// Starts teardown of the current session.
#[derive(Message, Debug, Clone, Copy, Default)]
#[rtype(result = "()")]
pub struct Close;

/// Closes the current session and stops the actor.
#[derive(Message, Debug, Clone, Copy, Default)]
#[rtype(result = "()")]
pub struct Shutdown;

/// Forwards a payload to the transport unless the session is closing.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SendPayload(pub Payload);

#[derive(Message, Debug, Clone, Copy, Default)]
#[rtype(result = "bool")]
pub struct IsActive;

#[derive(Message, Debug, Clone, Copy, Default)]
#[rtype(result = "ConnectionState")]
pub struct GetState;

/// Registers a recipient for connection events.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub recipient: Recipient<ConnectionEvent>,
    /// `None` subscribes to every event kind.
    pub kinds: Option<Vec<EventKind>>,
}

impl Subscribe {
    pub fn all(recipient: Recipient<ConnectionEvent>) -> Self {
        Self {
            recipient,
            kinds: None,
        }
    }

    pub fn to(kinds: impl IntoIterator<Item = EventKind>, recipient: Recipient<ConnectionEvent>) -> Self {
        Self {
            recipient,
            kinds: Some(kinds.into_iter().collect()),
        }
    }
}

// --- Actor Implementation ---

impl Actor for ConnectionActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!("ConnectionActor started for {}", self.params.url);
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        info!("ConnectionActor stopping.");
        self.close_session(ctx);
        Running::Stop
    }
}

// --- Message Handlers ---

impl Handler<Connect> for ConnectionActor {
    type Result = ResponseFuture<Result<(), TransportError>>;

    fn handle(&mut self, _msg: Connect, ctx: &mut Context<Self>) -> Self::Result {
        if self.is_active() {
            debug!("Connect requested while session is open; nothing to do.");
            return Box::pin(async { Ok(()) });
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let sink = SignalSink::new(id, ctx.address().recipient());

        let handle = match self.transport.open(&self.params, sink) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to open transport for {}: {}", self.params.url, e);
                return Box::pin(async move { Err(e) });
            }
        };

        let (tx, rx) = oneshot::channel();
        info!("Connecting to {} (session {})", self.params.url, id);
        self.replace_session(Session::new(id, handle, &self.params, tx), ctx);

        Box::pin(async move { rx.await.unwrap_or(Err(TransportError::Cancelled)) })
    }
}

impl Handler<Close> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, _msg: Close, ctx: &mut Context<Self>) {
        self.close_session(ctx);
    }
}

impl Handler<Shutdown> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Context<Self>) {
        // `stopping` tears the session down.
        ctx.stop();
    }
}

impl Handler<SendPayload> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: SendPayload, _ctx: &mut Context<Self>) {
        match self.session.as_ref() {
            Some(session) if session.is_closing => {
                trace!("Session {} is closing, dropping outgoing payload.", session.id);
            }
            Some(Session {
                handle: Some(handle),
                ..
            }) => handle.send(msg.0),
            _ => warn!("Attempted to send without a session, dropping payload."),
        }
    }
}

impl Handler<IsActive> for ConnectionActor {
    type Result = bool;

    fn handle(&mut self, _msg: IsActive, _ctx: &mut Context<Self>) -> bool {
        self.is_active()
    }
}

impl Handler<GetState> for ConnectionActor {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _msg: GetState, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(self.state())
    }
}

impl Handler<Subscribe> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Context<Self>) {
        self.subscribers.push(Subscriber {
            kinds: msg.kinds,
            recipient: msg.recipient,
        });
    }
}

// Handler for signals reported by the transport of a session
impl Handler<SessionSignal> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: SessionSignal, ctx: &mut Context<Self>) {
        let id = msg.session;
        let Some(closing) = self.current_session(id).map(|s| s.is_closing) else {
            return;
        };

        match msg.event {
            TransportEvent::Open => match self.params.wait_after_connect.filter(|d| !d.is_zero()) {
                Some(delay) => {
                    debug!("Session {} open, waiting {:?} before reporting ready", id, delay);
                    ctx.run_later(delay, move |act, ctx| act.on_ready(id, ctx));
                }
                None => self.on_ready(id, ctx),
            },
            TransportEvent::Error(err) => {
                if !closing {
                    warn!("Session {} reported error: {}", id, err);
                    self.emit(ConnectionEvent::Err(err.clone()));
                }
                // A pending connect is rejected even once closing.
                self.settle(id, Err(err));
            }
            TransportEvent::Close => {
                if !closing {
                    info!("Session {} closed by transport", id);
                    self.emit(ConnectionEvent::Close);
                }
                self.settle(id, Err(TransportError::Closing));
            }
            TransportEvent::Pong => {
                if !closing {
                    self.emit(ConnectionEvent::Pong);
                }
                self.reset_activity_check(ctx);
                self.settle(id, Ok(()));
            }
            TransportEvent::Message(payload) => {
                if !closing {
                    if self.params.verbose {
                        info!("Session {} ({}) received: {}", id, self.params.url, payload);
                    }
                    self.emit(ConnectionEvent::Message(payload));
                }
                self.settle(id, Ok(()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_match_variants() {
        assert_eq!(ConnectionEvent::Open.kind(), EventKind::Open);
        assert_eq!(
            ConnectionEvent::Err(TransportError::Closing).kind(),
            EventKind::Err
        );
        assert_eq!(ConnectionEvent::Close.kind(), EventKind::Close);
        assert_eq!(ConnectionEvent::Pong.kind(), EventKind::Pong);
        assert_eq!(
            ConnectionEvent::Message(Payload::from("x")).kind(),
            EventKind::Message
        );
    }
}
