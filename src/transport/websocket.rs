//! WebSocket transport
//!
//! This file implements the broker's WebSocket server. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Create a `Client` for each connection and register it with the `Broker`
//! - Decode JSON requests, run them through `handle_client_message`, and
//!   write replies and pushed deliveries back in the order they were produced
//! - Requeue a client's unacknowledged deliveries when it disconnects

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{Broker, lock};
use crate::client::Client;
use crate::transport::handler::handle_client_message;
use crate::transport::message::{ClientMessage, ServerMessage};

/// Bind `addr` and serve connections until the task is dropped.
pub async fn start_websocket_server(addr: &str, broker: Arc<Mutex<Broker>>) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, broker).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, broker: Arc<Mutex<Broker>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                spawn(handle_connection(stream, peer, broker.clone()));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Arc<Mutex<Broker>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Replies and deliveries share one channel so the client sees them in
    // the order the broker produced them.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx.clone());
    let client_id = client.id.clone();
    lock(&broker).register_client(client);
    info!(client = %client_id, %peer, "client connected");

    let writer = {
        let client_id = client_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(client = %client_id, error = %e, "failed to serialize frame");
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::text(text)).await {
                    warn!(client = %client_id, error = %e, "failed to send frame");
                    break;
                }
            }
            debug!(client = %client_id, "send loop closed");
        })
    };

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(client = %client_id, error = %e, "read failed");
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => {
                let mut broker = lock(&broker);
                handle_client_message(&mut broker, &client_id, request)
            }
            Err(err) => {
                warn!(
                    client = %client_id,
                    error = %err,
                    frame = %text.chars().take(100).collect::<String>(),
                    "invalid client message"
                );
                ServerMessage::Error {
                    message: format!("invalid request: {err}"),
                }
            }
        };
        if tx.send(reply).is_err() {
            break;
        }
    }

    lock(&broker).cleanup_client(&client_id);
    drop(tx);
    let _ = writer.await;
    info!(client = %client_id, "client disconnected");
}
