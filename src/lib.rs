//! rsipc - Discord desktop RPC client
//!
//! Talks to a running Discord client over:
//! - IPC: Unix domain socket `discord-ipc-N` or Windows named pipe
//! - WebSocket: `ws://127.0.0.1:6463-6472` (fallback)

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod transports;
pub mod types;

pub use client::{Client, ClientBuilder, ClientState, EventCallback};
pub use config::{Config, TransportKind};
pub use error::ClientError;
pub use protocol::{Command, DispatchEvent, Event, FromPayload, Payload};
pub use types::*;
