//! Wire protocol: framing, JSON envelopes and the payload registry

pub mod envelope;
pub mod frame;
pub mod registry;

pub use envelope::{DispatchEvent, Inbound, Request};
pub use frame::{Frame, FrameError};
pub use registry::{Command, Event, FromPayload, Payload};

use thiserror::Error;

/// Envelope and payload codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("envelope missing `{0}`")]
    MissingField(&'static str),
    #[error("{0} payload has no data")]
    MissingData(&'static str),
    #[error("failed to decode {discriminator} payload: {source}")]
    Payload {
        discriminator: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected {0} payload")]
    UnexpectedPayload(&'static str),
}
