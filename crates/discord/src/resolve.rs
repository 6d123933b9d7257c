//! Translation between remote entities and the bridge's canonical
//! conversation and participant references.
//!
//! Direct-message channels have no stable bridge-facing id of their own, so
//! they are addressed as `dm-<remoteUserId>` and reopened on demand.

use tracing::{debug, warn};

use marionette_channels::{
    ReceiveParams, RemoteConversation, RemoteParticipant,
    types::{dm_participant_id, dm_room_id},
};

use crate::{
    client::DiscordClient,
    context::PuppetContext,
    model::{Channel, Message, User},
};

const CHANNEL_URL_BASE: &str = "https://discordapp.com/channels";

/// Canonical conversation for a messageable channel.
pub fn remote_conversation(account_id: &str, channel: &Channel) -> Option<RemoteConversation> {
    let conversation = match channel {
        Channel::Dm { recipient, .. } => RemoteConversation {
            account_id: account_id.to_string(),
            room_id: dm_room_id(&recipient.id),
            is_direct: true,
            name: None,
            avatar_url: None,
        },
        Channel::Group { id, name, icon_url } => RemoteConversation {
            account_id: account_id.to_string(),
            room_id: id.clone(),
            is_direct: false,
            name: name.clone(),
            avatar_url: icon_url.clone(),
        },
        Channel::Text {
            id, name, guild, ..
        } => RemoteConversation {
            account_id: account_id.to_string(),
            room_id: id.clone(),
            is_direct: false,
            name: Some(format!("#{name} - {}", guild.name)),
            avatar_url: guild.icon_url.clone(),
        },
        Channel::Category { .. } | Channel::Other { .. } => return None,
    };
    Some(conversation)
}

pub fn remote_participant(account_id: &str, user: &User) -> RemoteParticipant {
    RemoteParticipant {
        account_id: account_id.to_string(),
        user_id: user.id.clone(),
        name: user.username.clone(),
        avatar_url: user.avatar_url.clone(),
    }
}

/// Link to a message in the remote web client.
pub fn external_url(channel: &Channel, message_id: &str) -> Option<String> {
    match channel {
        Channel::Text { id, guild, .. } => {
            Some(format!("{CHANNEL_URL_BASE}/{}/{id}/{message_id}", guild.id))
        },
        Channel::Dm { id, .. } | Channel::Group { id, .. } => {
            Some(format!("{CHANNEL_URL_BASE}/@me/{id}/{message_id}"))
        },
        Channel::Category { .. } | Channel::Other { .. } => None,
    }
}

/// Params for an event carried by a message.
pub fn message_params(account_id: &str, message: &Message) -> Option<ReceiveParams> {
    Some(ReceiveParams {
        conversation: remote_conversation(account_id, &message.channel)?,
        participant: remote_participant(account_id, &message.author),
        event_id: Some(message.id.clone()),
        external_url: external_url(&message.channel, &message.id),
    })
}

/// Params for a channel-level event (typing) by `user`.
pub fn channel_params(account_id: &str, channel: &Channel, user: &User) -> Option<ReceiveParams> {
    Some(ReceiveParams {
        conversation: remote_conversation(account_id, channel)?,
        participant: remote_participant(account_id, user),
        event_id: None,
        external_url: None,
    })
}

/// Find a user: guild members first, then friends, then the network.
pub async fn user_by_id(client: &dyn DiscordClient, user_id: &str) -> Option<User> {
    for guild in client.guilds() {
        if let Some(member) = guild.member(user_id) {
            return Some(member.clone());
        }
    }
    if let Some(friend) = client.friends().into_iter().find(|u| u.id == user_id) {
        return Some(friend);
    }
    match client.fetch_user(user_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!(user_id, error = %e, "failed to fetch discord user");
            None
        },
    }
}

/// Find the channel addressed by a bridge room id.
///
/// Native ids match cached group DMs and guild text channels only. `dm-`
/// ids reopen the direct channel with that user.
pub async fn channel_by_room_id(client: &dyn DiscordClient, room_id: &str) -> Option<Channel> {
    if let Some(user_id) = dm_participant_id(room_id) {
        let user = user_by_id(client, user_id).await?;
        return match client.create_dm(&user.id).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(room_id, error = %e, "failed to open discord dm channel");
                None
            },
        };
    }

    if let Some(channel) = client.cached_channel(room_id)
        && matches!(channel, Channel::Group { .. } | Channel::Text { .. })
    {
        return Some(channel);
    }
    for guild in client.guilds() {
        if let Some(channel @ Channel::Text { .. }) = guild.channel(room_id) {
            return Some(channel.clone());
        }
    }
    debug!(room_id, "discord channel not found");
    None
}

/// Resolve a bridge room id for `account_id` into a conversation.
pub async fn resolve_conversation(
    ctx: &PuppetContext,
    account_id: &str,
    room_id: &str,
) -> Option<RemoteConversation> {
    let session = ctx.session(account_id)?;
    let channel = channel_by_room_id(session.client.as_ref(), room_id).await?;
    remote_conversation(account_id, &channel)
}

pub async fn resolve_participant(
    ctx: &PuppetContext,
    account_id: &str,
    user_id: &str,
) -> Option<RemoteParticipant> {
    let session = ctx.session(account_id)?;
    let user = user_by_id(session.client.as_ref(), user_id).await?;
    Some(remote_participant(account_id, &user))
}

/// `dm-<id>` room of a participant, if the participant can be found.
pub async fn dm_room_for(ctx: &PuppetContext, participant: &RemoteParticipant) -> Option<String> {
    let resolved = resolve_participant(ctx, &participant.account_id, &participant.user_id).await?;
    Some(dm_room_id(&resolved.user_id))
}
