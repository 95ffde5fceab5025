//! `wslink-probe`: connects to an endpoint and prints connection events
//! until the connection goes down.
//!
//! Usage: `wslink-probe [URL]`. Without a URL, `connection.url` from
//! `wslink.toml` / `WSLINK_CONNECTION__URL` is used.

use actix::prelude::*;
use log::{error, info};
use tokio::sync::oneshot;
use wslink_client::{ConnectionEvent, LinkTarget, launch};

/// Prints events and signals `closed` once the connection is gone.
struct EventPrinter {
    closed: Option<oneshot::Sender<()>>,
}

impl Actor for EventPrinter {
    type Context = Context<Self>;
}

impl Handler<ConnectionEvent> for EventPrinter {
    type Result = ();

    fn handle(&mut self, msg: ConnectionEvent, _ctx: &mut Context<Self>) {
        match msg {
            ConnectionEvent::Open => println!("open"),
            ConnectionEvent::Pong => println!("pong"),
            ConnectionEvent::Message(payload) => println!("message: {}", payload),
            ConnectionEvent::Err(e) => println!("error: {}", e),
            ConnectionEvent::Close => {
                println!("close");
                if let Some(closed) = self.closed.take() {
                    let _ = closed.send(());
                }
            }
        }
    }
}

#[actix::main]
async fn main() {
    let target = match std::env::args().nth(1) {
        Some(url) => LinkTarget::Url(url),
        None => LinkTarget::Configured,
    };

    let (closed_tx, closed_rx) = oneshot::channel();
    let printer = EventPrinter {
        closed: Some(closed_tx),
    }
    .start();
    let link = match launch(target, None, Some(printer.recipient())).await {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to connect: {}", e);
            eprintln!("wslink-probe: {}", e);
            std::process::exit(1);
        }
    };
    info!("Probing {}", link.url());

    tokio::select! {
        _ = closed_rx => info!("Connection closed by peer or heartbeat."),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, closing connection.");
            if let Err(e) = link.close().await {
                error!("Close failed: {}", e);
            }
        }
    }
}
