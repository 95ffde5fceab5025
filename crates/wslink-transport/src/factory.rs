//! Factory function for creating Transport implementations based on the endpoint URL.

use crate::error::TransportError;
use crate::traits::Transport;

#[cfg(feature = "websocket")]
use crate::websocket::WebSocketTransport;

/// Creates a boxed `Transport` trait object based on the URL scheme.
///
/// Currently supports `ws://` and `wss://` if the `websocket` feature is enabled.
pub fn create_transport(url: &str) -> Result<Box<dyn Transport>, TransportError> {
    log::debug!("Attempting to create transport for URL: {}", url);

    if url.starts_with("ws://") || url.starts_with("wss://") {
        #[cfg(feature = "websocket")]
        {
            log::debug!("Creating WebSocketTransport for {}", url);
            Ok(Box::new(WebSocketTransport::new()))
        }
        #[cfg(not(feature = "websocket"))]
        {
            log::error!("WebSocket URL specified, but 'websocket' feature is not enabled.");
            Err(TransportError::UnsupportedScheme(
                "WebSocket (ws/wss) requires the 'websocket' feature.".to_string(),
            ))
        }
    } else {
        log::error!("Unsupported URL scheme found in: {}", url);
        Err(TransportError::UnsupportedScheme(format!(
            "Scheme not supported or feature not enabled for URL: {}",
            url
        )))
    }
}
