//! JSON envelope codec
//!
//! Inbound decoding runs in two stages: the discriminator fields (`cmd`,
//! `evt`, `nonce`) are read first with `data` left as raw JSON, then the
//! registry decodes `data` into its concrete type.

use super::registry::{self, Command, Event, Payload};
use super::CodecError;
use crate::models::ErrorData;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

const ERROR_EVENT: &str = "ERROR";

/// Outgoing command request
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub cmd: Command,
    pub args: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evt: Option<Event>,
    pub nonce: String,
}

impl Request {
    pub fn new(cmd: Command, args: serde_json::Value, nonce: impl Into<String>) -> Self {
        Self {
            cmd,
            args,
            evt: None,
            nonce: nonce.into(),
        }
    }

    /// Set the top-level `evt`, as SUBSCRIBE / UNSUBSCRIBE require
    pub fn with_event(mut self, evt: Event) -> Self {
        self.evt = Some(evt);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }
}

/// Discriminator stage: everything but `data` is decoded
#[derive(Debug, Deserialize)]
pub struct RawEnvelope<'a> {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub evt: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(borrow, default)]
    pub data: Option<&'a RawValue>,
}

/// Unsolicited event from the desktop app
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub event: Event,
    pub payload: Payload,
}

/// A decoded inbound envelope, already classified by role
#[derive(Debug)]
pub enum Inbound {
    /// `cmd == DISPATCH`, never correlated with a request
    Dispatch(DispatchEvent),
    /// Response to the request carrying `nonce`. Decode failures past the
    /// discriminator stage still reach the waiting caller.
    Response {
        nonce: String,
        payload: Result<Payload, CodecError>,
    },
    /// `evt == ERROR`, routed by nonce regardless of `cmd`
    Error {
        nonce: Option<String>,
        error: ErrorData,
    },
}

/// Decode one frame payload.
///
/// Only envelopes that cannot be routed anywhere come back as `Err`.
pub fn decode(bytes: &[u8]) -> Result<Inbound, CodecError> {
    let raw: RawEnvelope<'_> = serde_json::from_slice(bytes).map_err(CodecError::Envelope)?;

    if raw.evt.as_deref() == Some(ERROR_EVENT) {
        return match registry::decode_event(Event::Error, raw.data) {
            Ok(Payload::Error(error)) => Ok(Inbound::Error {
                nonce: raw.nonce,
                error,
            }),
            Ok(other) => Err(CodecError::UnexpectedPayload(other.kind())),
            Err(e) => route_failure(raw.nonce, e),
        };
    }

    let cmd = match raw.cmd.as_deref() {
        Some(name) => name.parse::<Command>(),
        None => Err(CodecError::MissingField("cmd")),
    };

    match cmd {
        Ok(Command::Dispatch) => {
            let event: Event = raw
                .evt
                .as_deref()
                .ok_or(CodecError::MissingField("evt"))?
                .parse()?;
            let payload = registry::decode_event(event, raw.data)?;
            Ok(Inbound::Dispatch(DispatchEvent { event, payload }))
        }
        Ok(cmd) => match raw.nonce {
            Some(nonce) => Ok(Inbound::Response {
                nonce,
                payload: registry::decode_response(cmd, raw.data),
            }),
            None => Err(CodecError::MissingField("nonce")),
        },
        Err(e) => route_failure(raw.nonce, e),
    }
}

fn route_failure(nonce: Option<String>, err: CodecError) -> Result<Inbound, CodecError> {
    match nonce {
        Some(nonce) => Ok(Inbound::Response {
            nonce,
            payload: Err(err),
        }),
        None => Err(err),
    }
}
