//! The read loop: sole reader of the transport

use super::{ClientState, Shared};
use crate::error::ClientError;
use crate::protocol::envelope::{self, Inbound};
use crate::protocol::{DispatchEvent, Frame, Payload};
use crate::transports::FrameSource;
use crate::types::{ClosePayload, IpcOpcode};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Run the read loop on its own task. A panic in it (including one from the
/// event callback) still tears the connection down.
pub(crate) async fn supervise(
    shared: Arc<Shared>,
    source: Box<dyn FrameSource>,
    shutdown: watch::Receiver<bool>,
) {
    let task = tokio::spawn(run(shared.clone(), source, shutdown));
    if let Err(e) = task.await {
        error!("Read loop died: {}", e);
        shared.teardown(None).await;
    }
}

async fn run(
    shared: Arc<Shared>,
    mut source: Box<dyn FrameSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rejection = None;

    loop {
        let frame = tokio::select! {
            biased;
            // Only ever flips to true, so any change means stop
            _ = shutdown.changed() => {
                debug!("Read loop stopping");
                break;
            }
            result = source.recv() => match result {
                Ok(frame) => frame,
                Err(e) => {
                    if shared.state() != ClientState::Closed {
                        warn!("Transport read failed: {}", e);
                    }
                    break;
                }
            },
        };

        match frame.opcode {
            IpcOpcode::Ping => {
                debug!("Ping ({} bytes)", frame.len());
                if let Err(e) = shared.write(Frame::pong(frame.payload)).await {
                    warn!("Failed to answer ping: {}", e);
                    break;
                }
            }
            IpcOpcode::Frame => shared.handle_envelope(&frame.payload),
            IpcOpcode::Close => {
                let close: ClosePayload = serde_json::from_slice(&frame.payload).unwrap_or_default();
                info!("Desktop app closed the connection ({}): {}", close.code, close.message);
                if shared.state() < ClientState::Ready {
                    rejection = Some(ClientError::Rejected {
                        code: close.code,
                        message: close.message,
                    });
                }
                break;
            }
            IpcOpcode::Pong | IpcOpcode::Handshake => {
                debug!("Ignoring inbound {:?} frame", frame.opcode);
            }
        }
    }

    shared.teardown(rejection).await;
}

impl Shared {
    fn handle_envelope(&self, bytes: &[u8]) {
        let inbound = match envelope::decode(bytes) {
            Ok(inbound) => inbound,
            Err(e) => {
                error!("Dropping undecodable message: {}", e);
                return;
            }
        };

        match inbound {
            Inbound::Dispatch(event) => self.dispatch(event),
            Inbound::Response { nonce, payload } => {
                let outcome = payload.map_err(|e| {
                    warn!("Response {} failed to decode: {}", nonce, e);
                    ClientError::from(e)
                });
                if !self.pending.resolve(&nonce, outcome) {
                    warn!("Response for unknown nonce {}", nonce);
                }
            }
            Inbound::Error {
                nonce: Some(nonce),
                error,
            } => {
                let outcome = Err(ClientError::Rpc {
                    code: error.code,
                    message: error.message,
                });
                if !self.pending.resolve(&nonce, outcome) {
                    warn!("Error for unknown nonce {}", nonce);
                }
            }
            Inbound::Error { nonce: None, error } => {
                if self.state() < ClientState::Ready {
                    self.finish_handshake(Err(ClientError::Rpc {
                        code: error.code,
                        message: error.message,
                    }));
                } else {
                    warn!("Uncorrelated RPC error {}: {}", error.code, error.message);
                }
            }
        }
    }

    fn dispatch(&self, event: DispatchEvent) {
        if let Payload::Ready(ready) = &event.payload {
            if self.session.set(ready.clone()).is_ok() {
                info!(
                    "READY: {} (v{}, {})",
                    ready.user.username, ready.v, ready.config.environment
                );
                self.advance(ClientState::Handshaking, ClientState::Ready);
                self.finish_handshake(Ok(()));
            } else {
                debug!("Ignoring repeated READY");
            }
        }

        match &self.on_event {
            Some(callback) => callback(event),
            None => debug!("Unhandled {} event", event.event),
        }
    }
}
