use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Delivery;
use crate::transport::channel::BrokerChannel;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::ChannelError;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A broker connection over WebSocket.
pub struct WsChannel {
    address: String,
    stream: Option<Stream>,
    pending: VecDeque<Delivery>,
}

impl WsChannel {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ChannelError> {
        let address = format!("{host}:{port}");
        let (stream, _) = connect_async(format!("ws://{address}"))
            .await
            .map_err(|e| ChannelError::Connection {
                host: address.clone(),
                reason: e.to_string(),
            })?;
        info!(broker = %address, "connected to broker");
        Ok(Self {
            address,
            stream: Some(stream),
            pending: VecDeque::new(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn read_frame(&mut self) -> Result<ServerMessage, ChannelError> {
        let stream = self.stream.as_mut().ok_or(ChannelError::Closed)?;
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(WsMessage::Close(_))) | None => return Err(ChannelError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl BrokerChannel for WsChannel {
    async fn request(&mut self, msg: ClientMessage) -> Result<ServerMessage, ChannelError> {
        let text = serde_json::to_string(&msg)?;
        let stream = self.stream.as_mut().ok_or(ChannelError::Closed)?;
        stream.send(WsMessage::text(text)).await?;

        loop {
            match self.read_frame().await? {
                ServerMessage::Delivery(delivery) => self.pending.push_back(delivery),
                reply => return Ok(reply),
            }
        }
    }

    async fn next_delivery(&mut self) -> Result<Delivery, ChannelError> {
        if let Some(delivery) = self.pending.pop_front() {
            return Ok(delivery);
        }
        loop {
            match self.read_frame().await? {
                ServerMessage::Delivery(delivery) => return Ok(delivery),
                other => warn!(frame = other.kind(), "ignoring unsolicited frame"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        self.pending.clear();
        match stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {
                debug!(broker = %self.address, "connection closed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
