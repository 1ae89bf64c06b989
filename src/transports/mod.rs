//! Transport layer for Discord RPC
//!
//! Supports:
//! - IPC (Windows named pipes / Unix sockets)
//! - WebSocket (ports 6463-6472)
//!
//! Both produce a [`Transport`]: a frame sink for the writers and a frame
//! source for the single read loop.

pub mod ipc;
pub mod websocket;

use crate::config::{Config, TransportKind};
use crate::protocol::frame::{Frame, FrameError};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

pub use ipc::IpcTransport;
pub use websocket::WebSocketTransport;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("unexpected {0} WebSocket message")]
    UnexpectedMessage(&'static str),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no reachable endpoint")]
    NoEndpoint { attempts: Vec<String> },
    #[error("connection closed")]
    Closed,
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Frame(FrameError::Io(err))
    }
}

/// Write half of a transport
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a transport
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame; any error means the connection is unusable
    async fn recv(&mut self) -> Result<Frame, TransportError>;
}

/// An open connection, already split for one reader and many writers
pub struct Transport {
    pub name: &'static str,
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("name", &self.name).finish()
    }
}

/// Strategy for opening a transport
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get transport name for logging
    fn name(&self) -> &'static str;

    /// Try every candidate endpoint in order; the first success wins
    async fn connect(&self, config: &Config) -> Result<Transport, TransportError>;
}

/// Connectors to try for the configured transport kind, in order
pub fn connectors(kind: TransportKind) -> Vec<Box<dyn Connector>> {
    match kind {
        TransportKind::Auto => vec![Box::new(IpcTransport), Box::new(WebSocketTransport)],
        TransportKind::Ipc => vec![Box::new(IpcTransport)],
        TransportKind::WebSocket => vec![Box::new(WebSocketTransport)],
    }
}

/// Open the first reachable transport
pub async fn connect(config: &Config) -> Result<Transport, TransportError> {
    let mut attempts = Vec::new();

    for connector in connectors(config.transport) {
        match connector.connect(config).await {
            Ok(transport) => {
                info!("Connected over {}", connector.name());
                return Ok(transport);
            }
            Err(TransportError::NoEndpoint { attempts: tried }) => {
                debug!("{} unavailable ({} candidates)", connector.name(), tried.len());
                attempts.extend(tried);
            }
            Err(e) => {
                debug!("{} failed: {}", connector.name(), e);
                attempts.push(format!("{}: {}", connector.name(), e));
            }
        }
    }

    Err(TransportError::NoEndpoint { attempts })
}
