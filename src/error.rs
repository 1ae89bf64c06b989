//! Client error types

use crate::protocol::CodecError;
use crate::transports::TransportError;
use crate::types::{CloseCode, RpcErrorCode};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`Client`](crate::Client).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every socket, pipe and port candidate failed
    #[error("no reachable Discord RPC endpoint (tried {})", .0.len())]
    NoEndpoint(Vec<String>),

    /// I/O or framing failure on an open connection
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Request could not be encoded, or its response could not be decoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Arguments failed to serialize
    #[error("invalid arguments: {0}")]
    InvalidArgs(#[source] serde_json::Error),

    /// The desktop app answered with an `ERROR` event
    #[error("RPC error {code}: {message}")]
    Rpc { code: u32, message: String },

    /// The desktop app closed the connection before READY
    #[error("connection rejected ({code}): {message}")]
    Rejected { code: u32, message: String },

    /// The connection is closed; pending and future requests fail with this
    #[error("connection closed")]
    Closed,

    /// READY did not arrive in time
    #[error("no READY within {0:?}")]
    HandshakeTimeout(Duration),

    /// Response decoded fine but was not the type the caller asked for
    #[error("expected {expected} payload, got {got}")]
    UnexpectedPayload {
        expected: &'static str,
        got: &'static str,
    },
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NoEndpoint { attempts } => ClientError::NoEndpoint(attempts),
            other => ClientError::Transport(other),
        }
    }
}

impl ClientError {
    /// Known application error code, for `Rpc` errors
    pub fn rpc_code(&self) -> Option<RpcErrorCode> {
        match self {
            ClientError::Rpc { code, .. } => RpcErrorCode::from_code(*code),
            _ => None,
        }
    }

    /// Known close code, for `Rejected` errors
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            ClientError::Rejected { code, .. } => CloseCode::from_code(*code),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ClientError::Closed)
    }
}
