//! Payload type registry
//!
//! Maps a response's `cmd`, or a dispatch's `evt`, to the concrete type its
//! `data` decodes into. This is the only place that knows the mapping; the
//! rest of the crate works with the [`Payload`] sum type.

use super::CodecError;
use crate::models::*;
use crate::types::Activity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;

macro_rules! wire_names {
    (
        $(#[$meta:meta])*
        pub enum $name:ident / $unknown:ident {
            $($variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(CodecError::$unknown(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

wire_names! {
    /// RPC commands (`cmd` field)
    pub enum Command / UnknownCommand {
        Dispatch => "DISPATCH",
        Authorize => "AUTHORIZE",
        Authenticate => "AUTHENTICATE",
        GetGuild => "GET_GUILD",
        GetGuilds => "GET_GUILDS",
        GetChannel => "GET_CHANNEL",
        GetChannels => "GET_CHANNELS",
        Subscribe => "SUBSCRIBE",
        Unsubscribe => "UNSUBSCRIBE",
        SetUserVoiceSettings => "SET_USER_VOICE_SETTINGS",
        SelectVoiceChannel => "SELECT_VOICE_CHANNEL",
        GetSelectedVoiceChannel => "GET_SELECTED_VOICE_CHANNEL",
        SelectTextChannel => "SELECT_TEXT_CHANNEL",
        GetVoiceSettings => "GET_VOICE_SETTINGS",
        SetVoiceSettings => "SET_VOICE_SETTINGS",
        SetCertifiedDevices => "SET_CERTIFIED_DEVICES",
        SetActivity => "SET_ACTIVITY",
        SendActivityJoinInvite => "SEND_ACTIVITY_JOIN_INVITE",
        CloseActivityRequest => "CLOSE_ACTIVITY_REQUEST",
    }
}

wire_names! {
    /// Dispatch events (`evt` field)
    pub enum Event / UnknownEvent {
        Ready => "READY",
        Error => "ERROR",
        GuildStatus => "GUILD_STATUS",
        GuildCreate => "GUILD_CREATE",
        ChannelCreate => "CHANNEL_CREATE",
        VoiceChannelSelect => "VOICE_CHANNEL_SELECT",
        VoiceStateCreate => "VOICE_STATE_CREATE",
        VoiceStateUpdate => "VOICE_STATE_UPDATE",
        VoiceStateDelete => "VOICE_STATE_DELETE",
        VoiceSettingsUpdate => "VOICE_SETTINGS_UPDATE",
        VoiceConnectionStatus => "VOICE_CONNECTION_STATUS",
        SpeakingStart => "SPEAKING_START",
        SpeakingStop => "SPEAKING_STOP",
        MessageCreate => "MESSAGE_CREATE",
        MessageUpdate => "MESSAGE_UPDATE",
        MessageDelete => "MESSAGE_DELETE",
        NotificationCreate => "NOTIFICATION_CREATE",
        ActivityJoin => "ACTIVITY_JOIN",
        ActivitySpectate => "ACTIVITY_SPECTATE",
        ActivityJoinRequest => "ACTIVITY_JOIN_REQUEST",
    }
}

/// Every decoded `data` value the client can receive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// `data` was absent or `null`
    Empty,
    Ready(ReadyData),
    Error(ErrorData),
    Authorize(AuthorizeData),
    Authenticate(Box<AuthenticateData>),
    Guild(Guild),
    Guilds(GuildList),
    Channel(Box<Channel>),
    Channels(ChannelList),
    Subscription(Subscription),
    VoiceSettings(Box<VoiceSettings>),
    UserVoiceSettings(UserVoiceSettings),
    Activity(Box<Activity>),
    GuildStatus(GuildStatus),
    GuildCreate(PartialGuild),
    ChannelCreate(ChannelCreate),
    VoiceChannelSelect(VoiceChannelSelect),
    VoiceState(Box<VoiceState>),
    VoiceConnectionStatus(VoiceConnectionStatus),
    Speaking(Speaking),
    Message(Box<MessageEvent>),
    Notification(Box<Notification>),
    ActivitySecret(ActivitySecret),
    ActivityJoinRequest(ActivityJoinRequest),
}

impl Payload {
    /// Variant name, for logs and mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "Empty",
            Payload::Ready(_) => "Ready",
            Payload::Error(_) => "Error",
            Payload::Authorize(_) => "Authorize",
            Payload::Authenticate(_) => "Authenticate",
            Payload::Guild(_) => "Guild",
            Payload::Guilds(_) => "Guilds",
            Payload::Channel(_) => "Channel",
            Payload::Channels(_) => "Channels",
            Payload::Subscription(_) => "Subscription",
            Payload::VoiceSettings(_) => "VoiceSettings",
            Payload::UserVoiceSettings(_) => "UserVoiceSettings",
            Payload::Activity(_) => "Activity",
            Payload::GuildStatus(_) => "GuildStatus",
            Payload::GuildCreate(_) => "GuildCreate",
            Payload::ChannelCreate(_) => "ChannelCreate",
            Payload::VoiceChannelSelect(_) => "VoiceChannelSelect",
            Payload::VoiceState(_) => "VoiceState",
            Payload::VoiceConnectionStatus(_) => "VoiceConnectionStatus",
            Payload::Speaking(_) => "Speaking",
            Payload::Message(_) => "Message",
            Payload::Notification(_) => "Notification",
            Payload::ActivitySecret(_) => "ActivitySecret",
            Payload::ActivityJoinRequest(_) => "ActivityJoinRequest",
        }
    }
}

fn is_null(data: Option<&RawValue>) -> bool {
    data.map_or(true, |raw| raw.get().trim() == "null")
}

fn typed<T: DeserializeOwned>(
    data: Option<&RawValue>,
    discriminator: &'static str,
) -> Result<T, CodecError> {
    if is_null(data) {
        return Err(CodecError::MissingData(discriminator));
    }
    let raw = data.map(RawValue::get).unwrap_or("null");
    serde_json::from_str(raw).map_err(|source| CodecError::Payload {
        discriminator,
        source,
    })
}

/// Like [`typed`] but `null`/absent data decodes to [`Payload::Empty`]
fn nullable<T: DeserializeOwned>(
    data: Option<&RawValue>,
    discriminator: &'static str,
    wrap: impl FnOnce(T) -> Payload,
) -> Result<Payload, CodecError> {
    if is_null(data) {
        Ok(Payload::Empty)
    } else {
        typed(data, discriminator).map(wrap)
    }
}

/// Decode the `data` of a command response
pub fn decode_response(cmd: Command, data: Option<&RawValue>) -> Result<Payload, CodecError> {
    let name = cmd.as_str();
    match cmd {
        Command::Dispatch => Err(CodecError::UnknownCommand(name.to_string())),
        Command::Authorize => typed(data, name).map(Payload::Authorize),
        Command::Authenticate => typed(data, name).map(|d| Payload::Authenticate(Box::new(d))),
        Command::GetGuild => typed(data, name).map(Payload::Guild),
        Command::GetGuilds => typed(data, name).map(Payload::Guilds),
        Command::GetChannel => typed(data, name).map(|d| Payload::Channel(Box::new(d))),
        Command::GetChannels => typed(data, name).map(Payload::Channels),
        Command::Subscribe | Command::Unsubscribe => typed(data, name).map(Payload::Subscription),
        Command::SetUserVoiceSettings => typed(data, name).map(Payload::UserVoiceSettings),
        Command::SelectVoiceChannel
        | Command::GetSelectedVoiceChannel
        | Command::SelectTextChannel => {
            nullable(data, name, |d| Payload::Channel(Box::new(d)))
        }
        Command::GetVoiceSettings | Command::SetVoiceSettings => {
            typed(data, name).map(|d| Payload::VoiceSettings(Box::new(d)))
        }
        Command::SetActivity => nullable(data, name, |d| Payload::Activity(Box::new(d))),
        Command::SetCertifiedDevices
        | Command::SendActivityJoinInvite
        | Command::CloseActivityRequest => Ok(Payload::Empty),
    }
}

/// Decode the `data` of a dispatch event
pub fn decode_event(evt: Event, data: Option<&RawValue>) -> Result<Payload, CodecError> {
    let name = evt.as_str();
    match evt {
        Event::Ready => typed(data, name).map(Payload::Ready),
        Event::Error => typed(data, name).map(Payload::Error),
        Event::GuildStatus => typed(data, name).map(Payload::GuildStatus),
        Event::GuildCreate => typed(data, name).map(Payload::GuildCreate),
        Event::ChannelCreate => typed(data, name).map(Payload::ChannelCreate),
        Event::VoiceChannelSelect => typed(data, name).map(Payload::VoiceChannelSelect),
        Event::VoiceStateCreate | Event::VoiceStateUpdate | Event::VoiceStateDelete => {
            typed(data, name).map(|d| Payload::VoiceState(Box::new(d)))
        }
        Event::VoiceSettingsUpdate => {
            typed(data, name).map(|d| Payload::VoiceSettings(Box::new(d)))
        }
        Event::VoiceConnectionStatus => typed(data, name).map(Payload::VoiceConnectionStatus),
        Event::SpeakingStart | Event::SpeakingStop => typed(data, name).map(Payload::Speaking),
        Event::MessageCreate | Event::MessageUpdate | Event::MessageDelete => {
            typed(data, name).map(|d| Payload::Message(Box::new(d)))
        }
        Event::NotificationCreate => {
            typed(data, name).map(|d| Payload::Notification(Box::new(d)))
        }
        Event::ActivityJoin | Event::ActivitySpectate => {
            typed(data, name).map(Payload::ActivitySecret)
        }
        Event::ActivityJoinRequest => typed(data, name).map(Payload::ActivityJoinRequest),
    }
}

/// Typed extraction from a [`Payload`], used by `Client::request`.
///
/// On mismatch the original payload is handed back so the caller can report
/// what actually arrived.
pub trait FromPayload: Sized {
    fn from_payload(payload: Payload) -> Result<Self, Payload>;
}

impl FromPayload for Payload {
    fn from_payload(payload: Payload) -> Result<Self, Payload> {
        Ok(payload)
    }
}

/// Accepts any payload; for commands whose response carries nothing useful
impl FromPayload for () {
    fn from_payload(_: Payload) -> Result<Self, Payload> {
        Ok(())
    }
}

macro_rules! from_payload {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl FromPayload for $ty {
                fn from_payload(payload: Payload) -> Result<Self, Payload> {
                    match payload {
                        Payload::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

macro_rules! from_boxed_payload {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl FromPayload for $ty {
                fn from_payload(payload: Payload) -> Result<Self, Payload> {
                    match payload {
                        Payload::$variant(value) => Ok(*value),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

from_payload! {
    Ready => ReadyData,
    Error => ErrorData,
    Authorize => AuthorizeData,
    Guild => Guild,
    Guilds => GuildList,
    Channels => ChannelList,
    Subscription => Subscription,
    UserVoiceSettings => UserVoiceSettings,
    GuildStatus => GuildStatus,
    GuildCreate => PartialGuild,
    ChannelCreate => ChannelCreate,
    VoiceChannelSelect => VoiceChannelSelect,
    VoiceConnectionStatus => VoiceConnectionStatus,
    Speaking => Speaking,
    ActivitySecret => ActivitySecret,
    ActivityJoinRequest => ActivityJoinRequest,
}

from_boxed_payload! {
    Authenticate => AuthenticateData,
    Channel => Channel,
    VoiceSettings => VoiceSettings,
    Activity => Activity,
    VoiceState => VoiceState,
    Message => MessageEvent,
    Notification => Notification,
}

/// `Empty` maps to `None`, the selected variant to `Some`
impl FromPayload for Option<Channel> {
    fn from_payload(payload: Payload) -> Result<Self, Payload> {
        match payload {
            Payload::Empty => Ok(None),
            Payload::Channel(channel) => Ok(Some(*channel)),
            other => Err(other),
        }
    }
}

impl FromPayload for Option<Activity> {
    fn from_payload(payload: Payload) -> Result<Self, Payload> {
        match payload {
            Payload::Empty => Ok(None),
            Payload::Activity(activity) => Ok(Some(*activity)),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[test]
    fn test_wire_names_roundtrip() {
        for cmd in Command::ALL {
            assert_eq!(cmd.as_str().parse::<Command>().unwrap(), *cmd);
        }
        for evt in Event::ALL {
            assert_eq!(evt.as_str().parse::<Event>().unwrap(), *evt);
        }
        assert!(matches!(
            "GET_EVERYTHING".parse::<Command>(),
            Err(CodecError::UnknownCommand(name)) if name == "GET_EVERYTHING"
        ));
        assert!(matches!(
            "NOPE".parse::<Event>(),
            Err(CodecError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_decode_guild_response() {
        let data = raw(r#"{"id": "123", "name": "Test Guild", "icon_url": null}"#);
        let payload = decode_response(Command::GetGuild, Some(&data)).unwrap();
        let guild = Guild::from_payload(payload).unwrap();
        assert_eq!(guild.id, "123");
        assert_eq!(guild.name, "Test Guild");
        assert!(guild.members.is_empty());
    }

    #[test]
    fn test_select_voice_channel_null_is_empty() {
        let data = raw("null");
        let payload = decode_response(Command::SelectVoiceChannel, Some(&data)).unwrap();
        assert_eq!(payload, Payload::Empty);
        assert_eq!(Option::<Channel>::from_payload(payload).unwrap(), None);

        let payload = decode_response(Command::GetSelectedVoiceChannel, None).unwrap();
        assert_eq!(payload, Payload::Empty);
    }

    #[test]
    fn test_missing_data_is_error() {
        assert!(matches!(
            decode_response(Command::GetGuilds, None),
            Err(CodecError::MissingData("GET_GUILDS"))
        ));
    }

    #[test]
    fn test_wrong_shape_is_payload_error() {
        let data = raw(r#"{"guilds": "not a list"}"#);
        assert!(matches!(
            decode_response(Command::GetGuilds, Some(&data)),
            Err(CodecError::Payload { discriminator: "GET_GUILDS", .. })
        ));
    }

    #[test]
    fn test_decode_events() {
        let data = raw(r#"{"user_id": "42", "channel_id": "7"}"#);
        let payload = decode_event(Event::SpeakingStart, Some(&data)).unwrap();
        assert_eq!(Speaking::from_payload(payload).unwrap().user_id, "42");

        let data = raw(r#"{"secret": "s3cr3t"}"#);
        let payload = decode_event(Event::ActivitySpectate, Some(&data)).unwrap();
        assert_eq!(payload.kind(), "ActivitySecret");
    }

    #[test]
    fn test_from_payload_mismatch_returns_original() {
        let payload = Payload::Subscription(Subscription {
            evt: "GUILD_STATUS".to_string(),
        });
        let back = Guild::from_payload(payload.clone()).unwrap_err();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_command_serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_string(&Command::SelectVoiceChannel).unwrap(),
            r#""SELECT_VOICE_CHANNEL""#
        );
    }
}
