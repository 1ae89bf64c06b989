//! WebSocket transport for Discord RPC
//!
//! Probes ports 6463-6472 on localhost. The handshake travels in the query
//! string (`?v=1&client_id=...&encoding=json`), so each text message carries
//! a bare JSON envelope with no binary framing.

use super::{Connector, FrameSink, FrameSource, Transport, TransportError};
use crate::config::Config;
use crate::protocol::frame::Frame;
use crate::types::{ClosePayload, IpcOpcode};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

/// WebSocket transport
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Wrap an established WebSocket stream
    pub fn from_stream<S>(stream: WebSocketStream<S>) -> Transport
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = stream.split();
        Transport {
            name: "WebSocket",
            sink: Box::new(WsSink { write }),
            source: Box::new(WsSource { read }),
        }
    }
}

/// RPC URL for a port
pub fn url(config: &Config, port: u16) -> String {
    format!(
        "ws://127.0.0.1:{}/?v={}&client_id={}&encoding=json",
        port, config.version, config.client_id
    )
}

/// Upgrade request with the `Origin` header set
pub fn request(config: &Config, port: u16) -> Result<Request, TransportError> {
    let mut request = url(config, port).into_client_request()?;
    let origin = HeaderValue::from_str(&config.origin)
        .map_err(|e| TransportError::InvalidRequest(format!("origin {:?}: {}", config.origin, e)))?;
    request.headers_mut().insert(ORIGIN, origin);
    Ok(request)
}

#[async_trait]
impl Connector for WebSocketTransport {
    fn name(&self) -> &'static str {
        "WebSocket"
    }

    async fn connect(&self, config: &Config) -> Result<Transport, TransportError> {
        let mut attempts = Vec::new();

        for port in config.ws_ports() {
            let request = request(config, port)?;
            match tokio_tungstenite::connect_async(request).await {
                Ok((stream, _response)) => {
                    info!("WebSocket connected on port {}", port);
                    return Ok(Self::from_stream(stream));
                }
                Err(e) => {
                    debug!("Port {} unavailable: {}", port, e);
                    attempts.push(format!("ws port {}: {}", port, e));
                }
            }
        }

        Err(TransportError::NoEndpoint { attempts })
    }
}

struct WsSink<S> {
    write: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame.opcode {
            // Already sent as query parameters during the upgrade
            IpcOpcode::Handshake => return Ok(()),
            IpcOpcode::Frame => {
                let text = String::from_utf8(frame.payload)
                    .map_err(|_| TransportError::UnexpectedMessage("non-UTF-8"))?;
                Message::Text(text)
            }
            IpcOpcode::Close => Message::Close(None),
            IpcOpcode::Ping => Message::Ping(frame.payload),
            IpcOpcode::Pong => Message::Pong(frame.payload),
        };
        self.write.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.write.close().await?;
        Ok(())
    }
}

struct WsSource<S> {
    read: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Frame::new(IpcOpcode::Frame, text.into_bytes()));
                }
                Some(Ok(Message::Close(close))) => {
                    let payload = close
                        .map(|c| ClosePayload {
                            code: u16::from(c.code).into(),
                            message: c.reason.into_owned(),
                        })
                        .unwrap_or_default();
                    let bytes = serde_json::to_vec(&payload).unwrap_or_default();
                    return Ok(Frame::new(IpcOpcode::Close, bytes));
                }
                // Control frames are answered by tungstenite itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => {
                    return Err(TransportError::UnexpectedMessage("binary"));
                }
                Some(Ok(Message::Frame(_))) => {
                    return Err(TransportError::UnexpectedMessage("raw frame"));
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::Closed),
            }
        }
    }
}
