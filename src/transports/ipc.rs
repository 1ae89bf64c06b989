//! IPC transport for Discord RPC
//!
//! Windows: Named pipes at `\\.\pipe\discord-ipc-{0-9}`
//! Unix: Sockets at `$XDG_RUNTIME_DIR/discord-ipc-{0-9}` (or `$TMPDIR`, `$TMP`,
//! `$TEMP`, `/tmp`)

use super::{Connector, FrameSink, FrameSource, Transport, TransportError};
use crate::config::Config;
use crate::protocol::frame::{read_frame, write_frame, Frame, FrameError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, info};

#[cfg(windows)]
const PIPE_PREFIX: &str = r"\\.\pipe\discord-ipc-";

#[cfg(unix)]
const SOCKET_PREFIX: &str = "discord-ipc-";

/// IPC transport (Unix socket or Windows named pipe)
#[derive(Debug, Clone, Copy, Default)]
pub struct IpcTransport;

impl IpcTransport {
    /// Wrap an already-connected byte stream with the IPC framer
    pub fn from_stream<S>(stream: S, max_frame_len: usize) -> Transport
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Transport {
            name: "IPC",
            sink: Box::new(StreamSink {
                writer,
                max_frame_len,
            }),
            source: Box::new(StreamSource {
                reader,
                max_frame_len,
            }),
        }
    }
}

/// First non-empty of the usual runtime/temp dir variables, else `/tmp`
pub fn runtime_dir() -> PathBuf {
    ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// Socket/pipe path for a slot
#[cfg(unix)]
pub fn endpoint(config: &Config, index: u32) -> PathBuf {
    let base = config.ipc_dir.clone().unwrap_or_else(runtime_dir);
    base.join(format!("{}{}", SOCKET_PREFIX, index))
}

/// Socket/pipe path for a slot
#[cfg(windows)]
pub fn endpoint(_config: &Config, index: u32) -> PathBuf {
    PathBuf::from(format!("{}{}", PIPE_PREFIX, index))
}

#[cfg(unix)]
async fn open(path: &std::path::Path) -> std::io::Result<tokio::net::UnixStream> {
    tokio::net::UnixStream::connect(path).await
}

#[cfg(windows)]
async fn open(
    path: &std::path::Path,
) -> std::io::Result<tokio::net::windows::named_pipe::NamedPipeClient> {
    tokio::net::windows::named_pipe::ClientOptions::new().open(path)
}

#[async_trait]
impl Connector for IpcTransport {
    fn name(&self) -> &'static str {
        "IPC"
    }

    async fn connect(&self, config: &Config) -> Result<Transport, TransportError> {
        let mut attempts = Vec::new();

        for index in 0..config.ipc_slots {
            let path = endpoint(config, index);
            match open(&path).await {
                Ok(stream) => {
                    info!("IPC connected at {:?}", path);
                    return Ok(Self::from_stream(stream, config.max_frame_len));
                }
                Err(e) => {
                    debug!("IPC slot {:?} unavailable: {}", path, e);
                    attempts.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        Err(TransportError::NoEndpoint { attempts })
    }
}

/// Framed writer over any byte stream
pub struct StreamSink<S> {
    writer: WriteHalf<S>,
    max_frame_len: usize,
}

#[async_trait]
impl<S> FrameSink for StreamSink<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if frame.len() > self.max_frame_len {
            return Err(FrameError::TooLarge {
                len: frame.len(),
                max: self.max_frame_len,
            }
            .into());
        }
        write_frame(&mut self.writer, &frame).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Framed reader over any byte stream
pub struct StreamSource<S> {
    reader: ReadHalf<S>,
    max_frame_len: usize,
}

#[async_trait]
impl<S> FrameSource for StreamSource<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    async fn recv(&mut self) -> Result<Frame, TransportError> {
        Ok(read_frame(&mut self.reader, self.max_frame_len).await?)
    }
}
