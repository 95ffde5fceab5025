//! Connection startup logic.

use crate::error::ClientError;
use crate::handle::LinkHandle;
use log::{debug, info};
use wslink_core::config::{self, Config};
use wslink_core::logging;
use wslink_transport::{ConnectParams, ConnectionEvent};

use actix::prelude::*;

/// Specifies which endpoint to connect to.
#[derive(Debug, Clone)]
pub enum LinkTarget {
    /// Connect to this URL; the remaining settings still come from configuration.
    Url(String),
    /// Use `connection.url` from configuration.
    Configured,
}

/// Loads configuration, starts a connection actor and connects it.
///
/// `events`, when given, is subscribed before connecting so it observes the
/// first `Open` event.
///
/// # Arguments
/// * `target` - The endpoint to connect to.
/// * `config` - Optional pre-loaded configuration. If None, calls `load_config()`.
/// * `events` - Optional recipient for every connection event.
pub async fn launch(
    target: LinkTarget,
    config: Option<Config>,
    events: Option<Recipient<ConnectionEvent>>,
) -> Result<LinkHandle, ClientError> {
    // 1. Load configuration if not provided
    let cfg = match config {
        Some(c) => c,
        None => config::load_config(None)?,
    };

    // 2. Setup logging
    if let Err(e) = logging::setup_logging(&cfg) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    debug!("Loaded configuration: {:?}", cfg);

    // 3. Resolve connect parameters and start the actor
    let params = connect_params(&target, &cfg)?;
    let link = LinkHandle::start(params)?;
    if let Some(recipient) = events {
        link.subscribe(recipient).await?;
    }

    // 4. Open the first session
    link.connect().await?;
    info!("Connected to {}", link.url());
    Ok(link)
}

fn connect_params(target: &LinkTarget, cfg: &Config) -> Result<ConnectParams, ClientError> {
    let mut connection = cfg.connection.clone();
    if let LinkTarget::Url(url) = target {
        connection.url = Some(url.clone());
    }
    Ok(ConnectParams::try_from(&connection)?)
}
