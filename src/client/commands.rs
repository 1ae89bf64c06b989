//! Typed command helpers on top of [`Client::request`]

use super::Client;
use crate::error::ClientError;
use crate::models::{
    AuthenticateData, AuthorizeData, Channel, ChannelList, Guild, GuildList, Subscription,
    UserVoiceSettings, VoiceSettings,
};
use crate::protocol::{Command, Event, FromPayload};
use crate::types::{Activity, SetActivityArgs};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// Extra arguments for channel selection
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectChannelOptions {
    /// Seconds the desktop app waits for the channel to load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Move the user even if they are already in another voice channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate: Option<bool>,
}

/// SET_CERTIFIED_DEVICES arguments. Device objects are passed through as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetCertifiedDevicesArgs {
    pub devices: Vec<Value>,
}

#[derive(Serialize)]
struct AuthorizeArgs<'a> {
    client_id: &'a str,
    scopes: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    rpc_token: Option<&'a str>,
}

#[derive(Serialize)]
struct SelectChannelArgs<'a> {
    // `null` leaves the current channel, so never skipped
    channel_id: Option<&'a str>,
    #[serde(flatten)]
    options: SelectChannelOptions,
}

impl Client {
    /// Ask the user to authorize this application for `scopes`
    pub async fn authorize(
        &self,
        scopes: &[&str],
        rpc_token: Option<&str>,
    ) -> Result<AuthorizeData, ClientError> {
        let args = AuthorizeArgs {
            client_id: &self.client_id,
            scopes,
            rpc_token,
        };
        self.request(Command::Authorize, args).await
    }

    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticateData, ClientError> {
        self.request(Command::Authenticate, json!({ "access_token": access_token }))
            .await
    }

    pub async fn get_guild(&self, guild_id: &str) -> Result<Guild, ClientError> {
        self.request(Command::GetGuild, json!({ "guild_id": guild_id }))
            .await
    }

    pub async fn get_guilds(&self) -> Result<GuildList, ClientError> {
        self.request(Command::GetGuilds, json!({})).await
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, ClientError> {
        self.request(Command::GetChannel, json!({ "channel_id": channel_id }))
            .await
    }

    /// Channels of a guild
    pub async fn get_channels(&self, guild_id: &str) -> Result<ChannelList, ClientError> {
        self.request(Command::GetChannels, json!({ "guild_id": guild_id }))
            .await
    }

    /// Join a voice channel, or leave the current one with `None`.
    /// Returns the joined channel, `None` after leaving.
    pub async fn select_voice_channel(
        &self,
        channel_id: Option<&str>,
        options: SelectChannelOptions,
    ) -> Result<Option<Channel>, ClientError> {
        let args = SelectChannelArgs {
            channel_id,
            options,
        };
        self.request(Command::SelectVoiceChannel, args).await
    }

    pub async fn get_selected_voice_channel(&self) -> Result<Option<Channel>, ClientError> {
        self.request(Command::GetSelectedVoiceChannel, json!({}))
            .await
    }

    pub async fn select_text_channel(
        &self,
        channel_id: Option<&str>,
        options: SelectChannelOptions,
    ) -> Result<Option<Channel>, ClientError> {
        let args = SelectChannelArgs {
            channel_id,
            options,
        };
        self.request(Command::SelectTextChannel, args).await
    }

    pub async fn get_voice_settings(&self) -> Result<VoiceSettings, ClientError> {
        self.request(Command::GetVoiceSettings, json!({})).await
    }

    /// Apply a partial update; unset fields are left unchanged
    pub async fn set_voice_settings(
        &self,
        settings: &VoiceSettings,
    ) -> Result<VoiceSettings, ClientError> {
        self.request(Command::SetVoiceSettings, settings).await
    }

    pub async fn set_user_voice_settings(
        &self,
        settings: &UserVoiceSettings,
    ) -> Result<UserVoiceSettings, ClientError> {
        self.request(Command::SetUserVoiceSettings, settings).await
    }

    /// Set Rich Presence for this process
    pub async fn set_activity(&self, activity: Activity) -> Result<Option<Activity>, ClientError> {
        let args = SetActivityArgs {
            pid: std::process::id(),
            activity: Some(activity),
        };
        self.request(Command::SetActivity, args).await
    }

    pub async fn clear_activity(&self) -> Result<(), ClientError> {
        let args = SetActivityArgs {
            pid: std::process::id(),
            activity: None,
        };
        self.request(Command::SetActivity, args).await
    }

    /// Accept an ask-to-join request
    pub async fn send_activity_join_invite(&self, user_id: &str) -> Result<(), ClientError> {
        self.request(Command::SendActivityJoinInvite, json!({ "user_id": user_id }))
            .await
    }

    /// Reject an ask-to-join request
    pub async fn close_activity_request(&self, user_id: &str) -> Result<(), ClientError> {
        self.request(Command::CloseActivityRequest, json!({ "user_id": user_id }))
            .await
    }

    pub async fn set_certified_devices(
        &self,
        args: &SetCertifiedDevicesArgs,
    ) -> Result<(), ClientError> {
        self.request(Command::SetCertifiedDevices, args).await
    }

    /// Subscribe to a dispatch event. Events then arrive on the
    /// [`on_event`](super::ClientBuilder::on_event) callback.
    pub async fn subscribe<A: Serialize>(
        &self,
        evt: Event,
        args: A,
    ) -> Result<Subscription, ClientError> {
        debug!("Subscribing to {}", evt);
        self.typed_roundtrip(Command::Subscribe, evt, args).await
    }

    pub async fn unsubscribe<A: Serialize>(
        &self,
        evt: Event,
        args: A,
    ) -> Result<Subscription, ClientError> {
        debug!("Unsubscribing from {}", evt);
        self.typed_roundtrip(Command::Unsubscribe, evt, args).await
    }

    async fn typed_roundtrip<T: FromPayload, A: Serialize>(
        &self,
        cmd: Command,
        evt: Event,
        args: A,
    ) -> Result<T, ClientError> {
        super::extract(self.roundtrip(cmd, Some(evt), args).await?)
    }
}
