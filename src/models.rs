//! Discord objects returned by RPC commands and carried by dispatch events
//!
//! Only the fields the desktop RPC surface actually returns are modelled;
//! deeply nested objects (embeds, attachments, member lists) stay as raw JSON.

use crate::types::Snowflake;
use serde::{Deserialize, Serialize};

/// Server configuration sent with READY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub cdn_host: String,
    pub api_endpoint: String,
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cdn_host: "cdn.discordapp.com".to_string(),
            api_endpoint: "//discord.com/api".to_string(),
            environment: "production".to_string(),
        }
    }
}

/// Discord user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub premium_type: u32,
}

/// READY dispatch data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyData {
    pub v: u32,
    #[serde(default)]
    pub config: ServerConfig,
    pub user: User,
}

/// Error event data (`evt == "ERROR"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: u32,
    pub message: String,
}

/// Application returned by AUTHENTICATE
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub rpc_origins: Vec<String>,
}

/// AUTHORIZE response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeData {
    pub code: String,
}

/// AUTHENTICATE response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateData {
    pub user: User,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expires: String,
    pub application: Application,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Guild as listed by GET_GUILDS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialGuild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// GET_GUILD response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub members: Vec<serde_json::Value>,
    #[serde(default)]
    pub vanity_url_code: Option<String>,
}

/// GET_GUILDS response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildList {
    pub guilds: Vec<PartialGuild>,
}

/// Channel type as reported by the desktop app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildAnnouncement,
    GuildStageVoice,
    Other(u8),
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildAnnouncement,
            13 => Self::GuildStageVoice,
            other => Self::Other(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(value: ChannelType) -> Self {
        match value {
            ChannelType::GuildText => 0,
            ChannelType::Dm => 1,
            ChannelType::GuildVoice => 2,
            ChannelType::GroupDm => 3,
            ChannelType::GuildCategory => 4,
            ChannelType::GuildAnnouncement => 5,
            ChannelType::GuildStageVoice => 13,
            ChannelType::Other(other) => other,
        }
    }
}

/// Channel as listed by GET_CHANNELS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialChannel {
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
}

/// GET_CHANNELS response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelList {
    pub channels: Vec<PartialChannel>,
}

/// GET_CHANNEL / SELECT_*_CHANNEL response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Per-user voice flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceFlags {
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub suppress: bool,
}

/// Pan settings for a user in a voice channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pan {
    pub left: f32,
    pub right: f32,
}

/// VOICE_STATE_* event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceState {
    pub voice_state: VoiceFlags,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub pan: Option<Pan>,
}

/// SET_USER_VOICE_SETTINGS request and response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserVoiceSettings {
    pub user_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan: Option<Pan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
}

/// Audio device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
}

/// Input or output half of the voice settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceIo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_devices: Vec<AudioDevice>,
}

/// Shortcut key combo entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutKey {
    #[serde(rename = "type")]
    pub kind: u8,
    pub code: u32,
    pub name: String,
}

/// Voice activation mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceMode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_threshold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<Vec<ShortcutKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f32>,
}

/// GET_VOICE_SETTINGS / SET_VOICE_SETTINGS payload; every field optional so the
/// same type works as a partial update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<VoiceIo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<VoiceIo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<VoiceMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_gain_control: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo_cancellation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_suppression: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_warning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
}

/// SUBSCRIBE / UNSUBSCRIBE response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub evt: String,
}

/// GUILD_STATUS event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildStatus {
    pub guild: PartialGuild,
    #[serde(default)]
    pub online: u32,
}

/// CHANNEL_CREATE event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCreate {
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
}

/// VOICE_CHANNEL_SELECT event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceChannelSelect {
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// VOICE_CONNECTION_STATUS event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConnectionStatus {
    pub state: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub pings: Vec<serde_json::Value>,
    #[serde(default)]
    pub average_ping: Option<f64>,
    #[serde(default)]
    pub last_ping: Option<f64>,
}

/// SPEAKING_START / SPEAKING_STOP event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaking {
    pub user_id: Snowflake,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
}

/// MESSAGE_CREATE / MESSAGE_UPDATE / MESSAGE_DELETE event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel_id: Snowflake,
    pub message: Message,
}

/// NOTIFICATION_CREATE event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel_id: Snowflake,
    pub message: Message,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// ACTIVITY_JOIN / ACTIVITY_SPECTATE event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySecret {
    pub secret: String,
}

/// ACTIVITY_JOIN_REQUEST event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityJoinRequest {
    pub user: User,
}
