//! Implementation of the `Transport` trait using WebSockets (`tokio-tungstenite`).

#![cfg(feature = "websocket")] // Only compile this module if websocket feature is enabled

use crate::error::TransportError;
use crate::traits::{SignalSink, Transport, TransportHandle};
use crate::types::{ConnectParams, Payload, ReadyState, SharedReadyState, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, client_async_tls, connect_async,
    tungstenite::{
        Error as TungsteniteError,
        client::IntoClientRequest,
        handshake::client::Request,
        http::Uri,
        protocol::Message as TungsteniteMessage,
    },
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the size of a proxy's reply to `CONNECT`.
const MAX_PROXY_RESPONSE_HEAD: usize = 8 * 1024;

/// Requests passed from a handle to its session task.
#[derive(Debug)]
enum Command {
    Send(Payload),
    Ping,
    Close,
}

/// WebSocket transport. Each opened session runs on its own task.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(
        &self,
        params: &ConnectParams,
        sink: SignalSink,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        let request = params.url.as_str().into_client_request()?;
        let proxy = params
            .agent
            .as_deref()
            .map(ProxyTarget::parse)
            .transpose()?;

        let state = SharedReadyState::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        info!("Opening WebSocket session {} to {}", sink.session(), params.url);
        actix::spawn(run_session(
            request,
            proxy,
            params.close_timeout,
            state.clone(),
            commands_rx,
            sink,
        ));

        Ok(Box::new(WebSocketHandle {
            state,
            commands: commands_tx,
        }))
    }
}

/// Handle to a running WebSocket session task.
pub struct WebSocketHandle {
    state: SharedReadyState,
    commands: mpsc::UnboundedSender<Command>,
}

impl WebSocketHandle {
    fn submit(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            trace!("WebSocket session task already finished, dropping {:?}", e.0);
        }
    }
}

impl TransportHandle for WebSocketHandle {
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, payload: Payload) {
        self.submit(Command::Send(payload));
    }

    fn ping(&self) {
        self.submit(Command::Ping);
    }

    fn close(&self) {
        if matches!(self.state.get(), ReadyState::Connecting | ReadyState::Open) {
            self.state.set(ReadyState::Closing);
        }
        self.submit(Command::Close);
    }
}

/// HTTP proxy the connection is tunnelled through with `CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub host: String,
    pub port: u16,
}

impl ProxyTarget {
    /// Accepts `http://host:port` or a bare `host:port`; the port defaults to 80.
    pub fn parse(agent: &str) -> Result<Self, TransportError> {
        let uri: Uri = agent
            .parse()
            .map_err(|e| TransportError::InvalidUrl(format!("Bad agent '{}': {}", agent, e)))?;
        match uri.scheme_str() {
            None | Some("http") => {}
            Some(other) => {
                return Err(TransportError::UnsupportedScheme(format!(
                    "Agent scheme '{}' is not supported, use an http:// proxy",
                    other
                )));
            }
        }
        let host = uri
            .host()
            .ok_or_else(|| TransportError::InvalidUrl(format!("Agent '{}' has no host", agent)))?;
        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(80),
        })
    }
}

/// Drives one session: handshake, then shuttles frames and commands until
/// the socket closes. Always finishes by emitting `Close`.
///
/// Once a close is requested the peer has `close_timeout` to finish the
/// close handshake; a silent peer gets its socket dropped.
async fn run_session(
    request: Request,
    proxy: Option<ProxyTarget>,
    close_timeout: Duration,
    state: SharedReadyState,
    mut commands: mpsc::UnboundedReceiver<Command>,
    sink: SignalSink,
) {
    let session = sink.session();

    // Sends and pings issued while connecting go out right after the handshake.
    let mut backlog = Vec::new();
    let handshake = open_stream(request, proxy);
    tokio::pin!(handshake);

    let stream = loop {
        tokio::select! {
            result = &mut handshake => break result,
            command = commands.recv() => match command {
                Some(Command::Close) | None => {
                    debug!("WebSocket session {} closed before the handshake finished", session);
                    state.set(ReadyState::Closed);
                    sink.emit(TransportEvent::Close);
                    return;
                }
                Some(other) => backlog.push(other),
            }
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            error!("WebSocket session {} failed to connect: {}", session, e);
            state.set(ReadyState::Closed);
            sink.emit(TransportEvent::Error(e));
            sink.emit(TransportEvent::Close);
            return;
        }
    };

    state.set(ReadyState::Open);
    info!("WebSocket session {} connected", session);
    sink.emit(TransportEvent::Open);

    let (mut write, mut read) = stream.split();
    let mut closing = false;
    let close_deadline = tokio::time::sleep(close_timeout);
    tokio::pin!(close_deadline);

    for command in backlog {
        if let Err(e) = write.send(into_frame(command)).await {
            warn!("WebSocket session {} send error: {}", session, e);
            sink.emit(TransportEvent::Error(e.into()));
            state.set(ReadyState::Closed);
            sink.emit(TransportEvent::Close);
            return;
        }
    }

    loop {
        tokio::select! {
            command = commands.recv(), if !closing => {
                match command {
                    Some(Command::Close) | None => {
                        debug!("Closing WebSocket session {}", session);
                        closing = true;
                        state.set(ReadyState::Closing);
                        close_deadline.as_mut().reset(Instant::now() + close_timeout);
                        match tokio::time::timeout(close_timeout, write.close()).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                if !matches!(e, TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed) {
                                    warn!("Error closing WebSocket session {}: {}", session, e);
                                }
                                break;
                            }
                            Err(_) => {
                                warn!("WebSocket session {} could not send its close frame within {:?}", session, close_timeout);
                                break;
                            }
                        }
                    }
                    Some(command) => {
                        if let Err(e) = write.send(into_frame(command)).await {
                            warn!("WebSocket session {} send error: {}", session, e);
                            sink.emit(TransportEvent::Error(e.into()));
                            break;
                        }
                    }
                }
            }
            () = &mut close_deadline, if closing => {
                warn!(
                    "WebSocket session {} peer did not finish the close handshake within {:?}, dropping the socket",
                    session, close_timeout
                );
                break;
            }
            frame = read.next() => {
                let forwarded = match frame {
                    Some(Ok(TungsteniteMessage::Text(text))) => {
                        sink.emit(TransportEvent::Message(Payload::Text(text)))
                    }
                    Some(Ok(TungsteniteMessage::Binary(bytes))) => {
                        sink.emit(TransportEvent::Message(Payload::Binary(bytes)))
                    }
                    Some(Ok(TungsteniteMessage::Pong(_))) => sink.emit(TransportEvent::Pong),
                    Some(Ok(TungsteniteMessage::Ping(_))) => {
                        // tungstenite queues the pong reply itself
                        trace!("WebSocket session {} received ping", session);
                        true
                    }
                    Some(Ok(TungsteniteMessage::Close(frame))) => {
                        debug!("WebSocket session {} received close frame: {:?}", session, frame);
                        state.set(ReadyState::Closing);
                        true
                    }
                    Some(Ok(TungsteniteMessage::Frame(_))) => {
                        trace!("WebSocket session {} ignoring raw frame", session);
                        true
                    }
                    Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) | None => {
                        debug!("WebSocket session {} stream ended", session);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket session {} receive error: {}", session, e);
                        sink.emit(TransportEvent::Error(e.into()));
                        break;
                    }
                };
                if !forwarded {
                    debug!("WebSocket session {} has no listener left, closing", session);
                    break;
                }
            }
        }
    }

    state.set(ReadyState::Closed);
    info!("WebSocket session {} closed", session);
    sink.emit(TransportEvent::Close);
}

fn into_frame(command: Command) -> TungsteniteMessage {
    match command {
        Command::Send(Payload::Text(text)) => TungsteniteMessage::Text(text),
        Command::Send(Payload::Binary(bytes)) => TungsteniteMessage::Binary(bytes),
        Command::Ping => TungsteniteMessage::Ping(Vec::new()),
        Command::Close => TungsteniteMessage::Close(None),
    }
}

async fn open_stream(
    request: Request,
    proxy: Option<ProxyTarget>,
) -> Result<WsStream, TransportError> {
    match proxy {
        None => {
            let (stream, response) = connect_async(request).await?;
            debug!("WebSocket handshake successful: {:?}", response.status());
            Ok(stream)
        }
        Some(proxy) => {
            let uri = request.uri();
            let host = uri
                .host()
                .ok_or_else(|| TransportError::InvalidUrl(format!("No host in {}", uri)))?
                .to_string();
            let default_port = if uri.scheme_str() == Some("wss") { 443 } else { 80 };
            let port = uri.port_u16().unwrap_or(default_port);

            debug!("Tunnelling to {}:{} through proxy {}:{}", host, port, proxy.host, proxy.port);
            let mut tcp = TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;
            let connect = format!(
                "CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n",
                host = host,
                port = port
            );
            tcp.write_all(connect.as_bytes()).await?;
            let head = read_response_head(&mut tcp).await?;
            check_connect_response(&head)?;

            let (stream, response) = client_async_tls(request, tcp).await?;
            debug!("WebSocket handshake through proxy successful: {:?}", response.status());
            Ok(stream)
        }
    }
}

/// Reads the proxy reply up to and including the blank line, one byte at a
/// time so nothing belonging to the tunnelled stream is consumed.
async fn read_response_head(tcp: &mut TcpStream) -> Result<String, TransportError> {
    let mut head = Vec::with_capacity(128);
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_PROXY_RESPONSE_HEAD {
            return Err(TransportError::Proxy("Response head too large".into()));
        }
        head.push(tcp.read_u8().await?);
    }
    String::from_utf8(head).map_err(|_| TransportError::Proxy("Response head is not UTF-8".into()))
}

fn check_connect_response(head: &str) -> Result<(), TransportError> {
    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| TransportError::Proxy(format!("Malformed status line: '{}'", status_line)))?;
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(TransportError::Proxy(format!("CONNECT refused: {}", status_line)))
    }
}
