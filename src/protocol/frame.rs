//! IPC framing
//!
//! Every message on the socket/pipe is `[opcode: i32 LE][length: i32 LE][payload]`.
//! The framer knows nothing about what the payload contains.

use crate::types::{Handshake, IpcOpcode};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the opcode + length header
pub const HEADER_LEN: usize = 8;

/// Upper bound on a single payload; anything larger is treated as a corrupt header
pub const DEFAULT_MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Framing errors. All of them are fatal to the connection.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid opcode {0}")]
    InvalidOpcode(i32),
    #[error("invalid frame length {0}")]
    InvalidLength(i32),
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// A single framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: IpcOpcode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: IpcOpcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    pub fn handshake(handshake: &Handshake) -> Result<Self, serde_json::Error> {
        Ok(Self::new(IpcOpcode::Handshake, serde_json::to_vec(handshake)?))
    }

    /// Empty-payload close frame
    pub fn close() -> Self {
        Self::new(IpcOpcode::Close, Vec::new())
    }

    pub fn pong(payload: Vec<u8>) -> Self {
        Self::new(IpcOpcode::Pong, payload)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encode a frame with its header into a single buffer.
///
/// Fails with `TooLarge` when the payload length does not fit the i32 header field.
pub fn encode(frame: &Frame) -> Result<Vec<u8>, FrameError> {
    let len = i32::try_from(frame.payload.len()).map_err(|_| FrameError::TooLarge {
        len: frame.payload.len(),
        max: i32::MAX as usize,
    })?;
    let mut buffer = Vec::with_capacity(HEADER_LEN + frame.payload.len());
    buffer.extend_from_slice(&frame.opcode.as_i32().to_le_bytes());
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(&frame.payload);
    Ok(buffer)
}

/// Parse and validate a header, returning the opcode and payload length
pub fn decode_header(
    header: &[u8; HEADER_LEN],
    max_len: usize,
) -> Result<(IpcOpcode, usize), FrameError> {
    let opcode = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    let opcode = IpcOpcode::try_from(opcode).map_err(FrameError::InvalidOpcode)?;
    let len = usize::try_from(length).map_err(|_| FrameError::InvalidLength(length))?;
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }
    Ok((opcode, len))
}

/// Decode one frame from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not yet hold a complete frame, otherwise
/// the frame and the number of bytes consumed.
pub fn decode(buf: &[u8], max_len: usize) -> Result<Option<(Frame, usize)>, FrameError> {
    let Some(header) = buf.get(..HEADER_LEN) else {
        return Ok(None);
    };
    let mut fixed = [0u8; HEADER_LEN];
    fixed.copy_from_slice(header);
    let (opcode, len) = decode_header(&fixed, max_len)?;

    let end = HEADER_LEN + len;
    match buf.get(HEADER_LEN..end) {
        Some(payload) => Ok(Some((Frame::new(opcode, payload), end))),
        None => Ok(None),
    }
}

/// Read exactly one frame. A short read at any point is an error.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let (opcode, len) = decode_header(&header, max_len)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Frame { opcode, payload })
}

/// Write one frame as a single buffer and flush it
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(frame)?).await?;
    writer.flush().await?;
    Ok(())
}
