//! Configuration for the rsipc client

use crate::protocol::frame::DEFAULT_MAX_FRAME_LEN;
use crate::types::RPC_VERSION;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which transport(s) to try when connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// IPC socket/pipe first, then WebSocket
    #[default]
    Auto,
    Ipc,
    WebSocket,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "ipc" | "pipe" => Ok(Self::Ipc),
            "ws" | "websocket" => Ok(Self::WebSocket),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord application (client) ID sent in the handshake
    pub client_id: String,
    /// RPC protocol version
    pub version: u32,
    /// Transport selection
    pub transport: TransportKind,
    /// Directory holding `discord-ipc-N`; overrides the env lookup (Unix only)
    pub ipc_dir: Option<PathBuf>,
    /// Number of `discord-ipc-N` slots to probe
    pub ipc_slots: u32,
    /// WebSocket RPC port range start
    pub ws_port_start: u16,
    /// WebSocket RPC port range end (inclusive)
    pub ws_port_end: u16,
    /// `Origin` header for the WebSocket upgrade
    pub origin: String,
    /// How long to wait for READY after the handshake
    pub handshake_timeout: Duration,
    /// Largest accepted frame payload
    pub max_frame_len: usize,
    /// Enable debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            version: RPC_VERSION,
            transport: TransportKind::Auto,
            ipc_dir: None,
            ipc_slots: 10,
            ws_port_start: 6463,
            ws_port_end: 6472,
            origin: "https://discord.com".to_string(),
            handshake_timeout: Duration::from_secs(10),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            debug: false,
        }
    }
}

impl Config {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = env::var("RSIPC_CLIENT_ID") {
            config.client_id = id;
        }

        if let Ok(kind) = env::var("RSIPC_TRANSPORT") {
            if let Ok(k) = kind.parse() {
                config.transport = k;
            }
        }

        if let Ok(dir) = env::var("RSIPC_IPC_DIR") {
            if !dir.is_empty() {
                config.ipc_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(port) = env::var("RSIPC_WS_PORT_START") {
            if let Ok(p) = port.parse() {
                config.ws_port_start = p;
            }
        }

        if let Ok(port) = env::var("RSIPC_WS_PORT_END") {
            if let Ok(p) = port.parse() {
                config.ws_port_end = p;
            }
        }

        if let Ok(origin) = env::var("RSIPC_ORIGIN") {
            config.origin = origin;
        }

        if let Ok(ms) = env::var("RSIPC_HANDSHAKE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.handshake_timeout = Duration::from_millis(ms);
            }
        }

        if env::var("RSIPC_DEBUG").is_ok() {
            config.debug = true;
        }

        config
    }

    /// Environment, then command-line flags on top.
    ///
    /// Returns the config and the remaining positional arguments.
    pub fn parse_args() -> Result<(Self, CliOptions), String> {
        Self::from_env().apply_args(env::args().skip(1))
    }

    pub fn apply_args<I>(mut self, args: I) -> Result<(Self, CliOptions), String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--client-id" => self.client_id = required(&mut args, &arg)?,
                "--transport" => self.transport = required(&mut args, &arg)?.parse()?,
                "--ipc-dir" => self.ipc_dir = Some(PathBuf::from(required(&mut args, &arg)?)),
                "--origin" => self.origin = required(&mut args, &arg)?,
                "--timeout" => {
                    let secs: u64 = required(&mut args, &arg)?
                        .parse()
                        .map_err(|e| format!("--timeout: {e}"))?;
                    self.handshake_timeout = Duration::from_secs(secs);
                }
                "--debug" => self.debug = true,
                "--listen" => options.listen = true,
                flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
                positional => options.positional.push(positional.to_string()),
            }
        }

        Ok((self, options))
    }

    /// Candidate WebSocket ports, in probe order
    pub fn ws_ports(&self) -> std::ops::RangeInclusive<u16> {
        self.ws_port_start..=self.ws_port_end
    }
}

/// Options that only matter to the CLI binary
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Keep printing dispatch events after the command completes
    pub listen: bool,
    /// `[COMMAND [ARGS_JSON]]`
    pub positional: Vec<String>,
}

fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}
