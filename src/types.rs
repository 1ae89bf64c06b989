//! Core types for the Discord RPC wire protocol
//!
//! Opcodes, handshake, close/error codes and the Rich Presence activity
//! shapes sent with `SET_ACTIVITY`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Process ID type
pub type Pid = u32;

/// Discord application/client ID
pub type ClientId = String;

/// Discord snowflake, always carried as a string on the wire
pub type Snowflake = String;

/// RPC protocol version sent in the handshake
pub const RPC_VERSION: u32 = 1;

/// IPC message types (Discord RPC protocol)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum IpcOpcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl TryFrom<i32> for IpcOpcode {
    /// The unrecognised raw opcode
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::Frame),
            2 => Ok(Self::Close),
            3 => Ok(Self::Ping),
            4 => Ok(Self::Pong),
            other => Err(other),
        }
    }
}

impl IpcOpcode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Close codes carried in a `Close` frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CloseCode {
    Normal = 1000,
    Unsupported = 1003,
    Abnormal = 1006,
    InvalidClientId = 4000,
    InvalidOrigin = 4001,
    RateLimited = 4002,
    TokenRevoked = 4003,
    InvalidVersion = 4004,
    InvalidEncoding = 4005,
}

impl CloseCode {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1000 => Self::Normal,
            1003 => Self::Unsupported,
            1006 => Self::Abnormal,
            4000 => Self::InvalidClientId,
            4001 => Self::InvalidOrigin,
            4002 => Self::RateLimited,
            4003 => Self::TokenRevoked,
            4004 => Self::InvalidVersion,
            4005 => Self::InvalidEncoding,
            _ => return None,
        })
    }
}

/// Application error codes carried in an `ERROR` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RpcErrorCode {
    UnknownError = 1000,
    InvalidPayload = 4000,
    InvalidCommand = 4002,
    InvalidGuild = 4003,
    InvalidEvent = 4004,
    InvalidChannel = 4005,
    InvalidPermissions = 4006,
    InvalidClientId = 4007,
    InvalidOrigin = 4008,
    InvalidToken = 4009,
    InvalidUser = 4010,
    OAuth2Error = 5000,
    SelectChannelTimedOut = 5001,
    GetGuildTimedOut = 5002,
    SelectVoiceForceRequired = 5003,
    CaptureShortcutAlreadyListening = 5004,
}

impl RpcErrorCode {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1000 => Self::UnknownError,
            4000 => Self::InvalidPayload,
            4002 => Self::InvalidCommand,
            4003 => Self::InvalidGuild,
            4004 => Self::InvalidEvent,
            4005 => Self::InvalidChannel,
            4006 => Self::InvalidPermissions,
            4007 => Self::InvalidClientId,
            4008 => Self::InvalidOrigin,
            4009 => Self::InvalidToken,
            4010 => Self::InvalidUser,
            5000 => Self::OAuth2Error,
            5001 => Self::SelectChannelTimedOut,
            5002 => Self::GetGuildTimedOut,
            5003 => Self::SelectVoiceForceRequired,
            5004 => Self::CaptureShortcutAlreadyListening,
            _ => return None,
        })
    }
}

/// Handshake sent by the client right after the transport opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub v: u32,
    pub client_id: ClientId,
}

/// Payload of a `Close` frame sent by the desktop app
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClosePayload {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

/// Activity timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Activity assets (images)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

/// Activity party info
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
}

/// Join/spectate secrets, echoed back in `ACTIVITY_JOIN` / `ACTIVITY_SPECTATE`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secrets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
}

/// Activity button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

/// Discord Rich Presence activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Secrets>,
    /// Buttons are sent as `{label, url}` but the app echoes back labels only
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_buttons"
    )]
    pub buttons: Option<Vec<Button>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<bool>,
    #[serde(rename = "type", default)]
    pub activity_type: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub flags: u32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn deserialize_buttons<'de, D>(deserializer: D) -> Result<Option<Vec<Button>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireButton {
        Full(Button),
        Label(String),
    }

    let raw: Option<Vec<WireButton>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|buttons| {
        buttons
            .into_iter()
            .map(|b| match b {
                WireButton::Full(button) => button,
                WireButton::Label(label) => Button {
                    label,
                    url: String::new(),
                },
            })
            .collect()
    }))
}

/// SET_ACTIVITY command arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActivityArgs {
    pub pid: Pid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
}
