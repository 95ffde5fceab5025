use thiserror::Error;

/// Errors reported by a transport or used to reject a pending connect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid URL or connection parameters: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Proxy tunnel failed: {0}")]
    Proxy(String),

    #[error("Underlying I/O error: {0}")]
    Io(String),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[cfg(feature = "websocket")]
    #[error("WebSocket protocol error: {0}")]
    WebSocketError(String),

    #[error("Send operation failed: {0}")]
    SendFailed(String),

    /// The transport closed before the connection became ready.
    #[error("closing")]
    Closing,

    /// A newer `connect()` replaced the session this attempt belonged to.
    #[error("Session superseded by a newer connect")]
    Superseded,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown transport error: {0}")]
    Other(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closing,
            WsError::Io(io_err) => TransportError::Io(io_err.to_string()),
            WsError::Tls(tls_err) => TransportError::TlsError(format!("{:?}", tls_err)),
            WsError::Capacity(reason) => {
                TransportError::SendFailed(format!("Capacity error: {}", reason))
            }
            WsError::Protocol(reason) => {
                TransportError::WebSocketError(format!("Protocol violation: {}", reason))
            }
            WsError::WriteBufferFull(_) => TransportError::SendFailed("Send queue full".into()),
            WsError::Utf8 => TransportError::WebSocketError("Invalid UTF-8 received".into()),
            WsError::Url(parse_err) => {
                TransportError::InvalidUrl(format!("URL parse error: {}", parse_err))
            }
            WsError::Http(resp) => TransportError::ConnectionFailed(format!(
                "HTTP error during handshake: Status {}",
                resp.status()
            )),
            WsError::HttpFormat(http_err) => {
                TransportError::ConnectionFailed(format!("HTTP format error: {}", http_err))
            }
            _ => TransportError::Other(format!("Unknown tungstenite error: {}", err)),
        }
    }
}
