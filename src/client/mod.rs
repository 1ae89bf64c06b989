//! Discord RPC client
//!
//! One read-loop task owns the transport's read half for the lifetime of
//! the connection. Any number of tasks may call [`Client::send`]
//! concurrently; each request gets its own nonce and waits on its own
//! channel, and writes are serialized by a single writer lock.
//!
//! ```ignore
//! use rsipc::{ClientBuilder, Config};
//!
//! let client = ClientBuilder::new(Config::new("1234567890"))
//!     .on_event(|event| println!("{}", event.event))
//!     .connect()
//!     .await?;
//!
//! println!("connected as {}", client.user().username);
//! let guilds = client.get_guilds().await?;
//! ```

mod commands;
mod pending;
mod reader;

pub use commands::{SelectChannelOptions, SetCertifiedDevicesArgs};

use crate::config::Config;
use crate::error::ClientError;
use crate::models::{ReadyData, ServerConfig, User};
use crate::protocol::{
    CodecError, Command, DispatchEvent, Event, Frame, FromPayload, Payload, Request,
};
use crate::transports::{self, FrameSink, Transport};
use crate::types::{Handshake, IpcOpcode};
use parking_lot::Mutex as SyncMutex;
use pending::PendingTable;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Callback for dispatch events. Runs on the read loop, so keep it short.
pub type EventCallback = Arc<dyn Fn(DispatchEvent) + Send + Sync>;

/// Connection lifecycle; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ClientState {
    Connecting = 0,
    Handshaking = 1,
    Ready = 2,
    Closed = 3,
}

impl ClientState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Handshaking,
            2 => Self::Ready,
            _ => Self::Closed,
        }
    }
}

/// State shared between callers and the read loop
pub(crate) struct Shared {
    writer: Mutex<Box<dyn FrameSink>>,
    pending: PendingTable,
    state: AtomicU8,
    session: OnceLock<ReadyData>,
    ready_tx: SyncMutex<Option<oneshot::Sender<Result<(), ClientError>>>>,
    on_event: Option<EventCallback>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn state(&self) -> ClientState {
        ClientState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move forward from `from` to `to`; false if the state already moved on
    fn advance(&self, from: ClientState, to: ClientState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn write(&self, frame: Frame) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        writer.send(frame).await.map_err(ClientError::Transport)
    }

    fn finish_handshake(&self, result: Result<(), ClientError>) {
        let tx = self.ready_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(result);
        }
    }

    /// Tear the connection down once: refuse and fail every request, stop
    /// the read loop, close the write half.
    async fn teardown(&self, rejection: Option<ClientError>) {
        let previous = self.state.swap(ClientState::Closed as u8, Ordering::AcqRel);
        if ClientState::from_u8(previous) == ClientState::Closed {
            return;
        }

        let failed = self.pending.close();
        if failed > 0 {
            info!("Connection closed with {} pending request(s)", failed);
        }
        self.finish_handshake(Err(rejection.unwrap_or(ClientError::Closed)));
        let _ = self.shutdown.send(true);

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            debug!("Error closing transport: {}", e);
        }
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    config: Config,
    on_event: Option<EventCallback>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            on_event: None,
        }
    }

    /// Register the dispatch-event callback. READY is delivered here too.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(DispatchEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(callback));
        self
    }

    /// Open the configured transport and complete the handshake
    pub async fn connect(self) -> Result<Client, ClientError> {
        let transport = transports::connect(&self.config).await?;
        self.connect_with(transport).await
    }

    /// Complete the handshake over an already-open transport
    pub async fn connect_with(self, transport: Transport) -> Result<Client, ClientError> {
        let Transport { name, sink, source } = transport;
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            writer: Mutex::new(sink),
            pending: PendingTable::default(),
            state: AtomicU8::new(ClientState::Connecting as u8),
            session: OnceLock::new(),
            ready_tx: SyncMutex::new(Some(ready_tx)),
            on_event: self.on_event,
            shutdown: shutdown_tx,
        });

        let handshake = Handshake {
            v: self.config.version,
            client_id: self.config.client_id.clone(),
        };
        let frame = Frame::handshake(&handshake).map_err(CodecError::Encode)?;
        shared.advance(ClientState::Connecting, ClientState::Handshaking);
        if let Err(e) = shared.write(frame).await {
            shared.teardown(None).await;
            return Err(e);
        }
        debug!("Handshake sent over {} (v{})", name, handshake.v);

        let reader = tokio::spawn(reader::supervise(shared.clone(), source, shutdown_rx));

        let timeout = self.config.handshake_timeout;
        let outcome = match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                warn!("No READY from {} within {:?}", name, timeout);
                Err(ClientError::HandshakeTimeout(timeout))
            }
        };
        let ready = outcome.and_then(|()| shared.session.get().cloned().ok_or(ClientError::Closed));

        match ready {
            Ok(ready) => Ok(Client {
                shared,
                reader: SyncMutex::new(Some(reader)),
                transport: name,
                client_id: self.config.client_id,
                ready,
            }),
            Err(e) => {
                shared.teardown(None).await;
                let _ = reader.await;
                Err(e)
            }
        }
    }
}

/// Connected RPC client
pub struct Client {
    shared: Arc<Shared>,
    reader: SyncMutex<Option<JoinHandle<()>>>,
    transport: &'static str,
    client_id: String,
    ready: ReadyData,
}

impl Client {
    /// Connect with the default builder (no event callback)
    pub async fn connect(config: Config) -> Result<Self, ClientError> {
        ClientBuilder::new(config).connect().await
    }

    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Authenticated user from READY
    pub fn user(&self) -> &User {
        &self.ready.user
    }

    /// Server configuration from READY
    pub fn server_config(&self) -> &ServerConfig {
        &self.ready.config
    }

    /// Protocol version reported in READY
    pub fn version(&self) -> u32 {
        self.ready.v
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Name of the transport in use ("IPC" or "WebSocket")
    pub fn transport_name(&self) -> &'static str {
        self.transport
    }

    pub fn state(&self) -> ClientState {
        self.shared.state()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ClientState::Closed
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Send a command and wait for its response payload
    pub async fn send<A: Serialize>(&self, cmd: Command, args: A) -> Result<Payload, ClientError> {
        self.roundtrip(cmd, None, args).await
    }

    /// Send a command and extract a typed response
    pub async fn request<T, A>(&self, cmd: Command, args: A) -> Result<T, ClientError>
    where
        T: FromPayload,
        A: Serialize,
    {
        extract(self.send(cmd, args).await?)
    }

    pub(crate) async fn roundtrip<A: Serialize>(
        &self,
        cmd: Command,
        evt: Option<Event>,
        args: A,
    ) -> Result<Payload, ClientError> {
        let args = serde_json::to_value(args).map_err(ClientError::InvalidArgs)?;
        let nonce = new_nonce();
        let mut request = Request::new(cmd, args, nonce.clone());
        if let Some(evt) = evt {
            request = request.with_event(evt);
        }
        let frame = Frame::new(IpcOpcode::Frame, request.encode()?);

        // Registered before writing so a fast response always finds its waiter
        let waiter = self.shared.pending.register(nonce)?;
        self.shared.write(frame).await?;
        debug!("Sent {}", cmd);

        waiter.wait().await
    }

    /// Resolves once the connection is closed, from either side
    pub async fn closed(&self) {
        let mut rx = self.shared.shutdown.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Send a Close frame, stop the read loop and fail pending requests.
    /// Calling it again is a no-op.
    pub async fn close(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.shared.write(Frame::close()).await {
            debug!("Failed to send Close frame: {}", e);
        }
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        self.shared.teardown(None).await;
        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            let _ = reader.await;
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Read loop tears down on its own once signalled
        let _ = self.shared.shutdown.send(true);
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .field("client_id", &self.client_id)
            .field("state", &self.state())
            .finish()
    }
}

fn extract<T: FromPayload>(payload: Payload) -> Result<T, ClientError> {
    T::from_payload(payload).map_err(|other| ClientError::UnexpectedPayload {
        expected: std::any::type_name::<T>(),
        got: other.kind(),
    })
}

/// 32 hex characters, unique per request
fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
