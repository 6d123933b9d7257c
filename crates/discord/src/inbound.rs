//! Remote events into bridge calls.
//!
//! Message-shaped events pass the same gate in order: live session,
//! resolvable conversation, scope policy, send-lock wait, echo check. Only
//! then is the event formatted and forwarded.

use tracing::{debug, error, info};

#[cfg(feature = "metrics")]
use {crate::definitions as m, metrics::counter};

use marionette_channels::{AccountIdentity, Presence, ReceiveParams};

use crate::{
    Result,
    client::DiscordEvent,
    context::PuppetContext,
    format::PuppetCallbacks,
    model::{Channel, CurrentUser, Message, MessageKind, OnlineStatus, Reaction, User},
    resolve::{channel_params, message_params, remote_participant},
    state::SessionStatus,
};

/// Dispatch one remote event for `account_id`.
pub async fn handle_event(
    ctx: &PuppetContext,
    account_id: &str,
    event: DiscordEvent,
) -> Result<()> {
    #[cfg(feature = "metrics")]
    counter!(m::EVENTS_RECEIVED_TOTAL, "event" => event.kind()).increment(1);

    match event {
        DiscordEvent::Ready(me) => handle_ready(ctx, account_id, &me).await,
        DiscordEvent::MessageCreate(message) => handle_message(ctx, account_id, &message).await,
        DiscordEvent::MessageUpdate { old, new } => {
            handle_message_update(ctx, account_id, &old, &new).await
        },
        DiscordEvent::MessageDelete(message) => {
            handle_message_delete(ctx, account_id, &message).await
        },
        DiscordEvent::MessageDeleteBulk(messages) => {
            handle_message_delete_bulk(ctx, account_id, &messages).await;
            Ok(())
        },
        DiscordEvent::TypingStart { channel, user } => {
            handle_typing(ctx, account_id, &channel, &user, true).await
        },
        DiscordEvent::TypingStop { channel, user } => {
            handle_typing(ctx, account_id, &channel, &user, false).await
        },
        DiscordEvent::PresenceUpdate {
            user,
            status,
            activity,
        } => handle_presence(ctx, account_id, &user, status, activity.as_deref()).await,
        DiscordEvent::ReactionAdd { reaction, user } => {
            handle_reaction(ctx, account_id, &reaction, &user).await
        },
    }
}

/// Session, conversation, scope, lock wait and echo check for a message.
async fn admit_message(
    ctx: &PuppetContext,
    account_id: &str,
    message: &Message,
) -> Option<ReceiveParams> {
    let Some(session) = ctx.session(account_id) else {
        debug!(account_id, "no session, dropping event");
        return None;
    };
    let Some(params) = message_params(account_id, message) else {
        debug!(account_id, channel_id = message.channel.id(), "unsupported channel");
        return None;
    };
    if !ctx.scope.in_scope(account_id, &message.channel).await {
        let room_id = &params.conversation.room_id;
        info!(account_id, room_id = %room_id, "unhandled channel, dropping event");
        #[cfg(feature = "metrics")]
        counter!(m::SCOPE_DENIALS_TOTAL).increment(1);
        return None;
    }
    ctx.send_lock.wait(&params.conversation.lock_key()).await;
    if session.consume_echo(&message.author.id, &message.id) {
        debug!(account_id, message_id = %message.id, "dropping own echo");
        #[cfg(feature = "metrics")]
        counter!(m::ECHOES_SUPPRESSED_TOTAL).increment(1);
        return None;
    }
    Some(params)
}

/// Account logged in: publish its identity.
pub async fn handle_ready(ctx: &PuppetContext, account_id: &str, me: &CurrentUser) -> Result<()> {
    let data = {
        let mut accounts = ctx.accounts.write().unwrap_or_else(|e| e.into_inner());
        let Some(state) = accounts.get_mut(account_id) else {
            debug!(account_id, "ready for unknown session");
            return Ok(());
        };
        state.config.username = Some(me.user.tag());
        state.config.id = Some(me.user.id.clone());
        state.status = SessionStatus::Ready;
        serde_json::to_value(&state.config)?
    };
    info!(account_id, username = %me.user.tag(), "discord account ready");

    let identity = AccountIdentity {
        remote_user_id: me.user.id.clone(),
        data,
    };
    ctx.bridge.set_account_identity(account_id, &identity).await?;
    ctx.bridge.send_status_message(account_id, "connected").await?;
    Ok(())
}

pub async fn handle_message(
    ctx: &PuppetContext,
    account_id: &str,
    message: &Message,
) -> Result<()> {
    if !matches!(message.kind, MessageKind::Default | MessageKind::Reply) {
        debug!(account_id, message_id = %message.id, "ignoring system message");
        return Ok(());
    }
    let Some(mut params) = admit_message(ctx, account_id, message).await else {
        return Ok(());
    };

    let external_url = params.external_url.take();
    for attachment in &message.attachments {
        params.external_url = Some(attachment.url.clone());
        ctx.bridge
            .receive_file_by_url(&params, &attachment.url, Some(&attachment.filename))
            .await?;
    }
    params.external_url = external_url;

    if !message.content.is_empty() {
        let callbacks = PuppetCallbacks::new(ctx, account_id);
        let content = ctx.formatter.to_bridge(message, &callbacks).await;
        ctx.bridge.receive_message(&params, content).await?;
    }
    Ok(())
}

pub async fn handle_message_update(
    ctx: &PuppetContext,
    account_id: &str,
    old: &Message,
    new: &Message,
) -> Result<()> {
    if old.content == new.content {
        return Ok(());
    }
    let Some(params) = admit_message(ctx, account_id, old).await else {
        return Ok(());
    };

    let callbacks = PuppetCallbacks::new(ctx, account_id);
    let content = ctx.formatter.to_bridge(new, &callbacks).await;
    if old.content.is_empty() {
        // Nothing was bridged as text before, so there is nothing to edit.
        ctx.bridge.receive_message(&params, content).await?;
    } else {
        ctx.bridge.receive_edit(&params, &old.id, content).await?;
    }
    Ok(())
}

pub async fn handle_message_delete(
    ctx: &PuppetContext,
    account_id: &str,
    message: &Message,
) -> Result<()> {
    let Some(params) = admit_message(ctx, account_id, message).await else {
        return Ok(());
    };
    ctx.bridge.receive_redact(&params, &message.id).await?;
    Ok(())
}

/// Delete each message independently. Returns the number that failed.
pub async fn handle_message_delete_bulk(
    ctx: &PuppetContext,
    account_id: &str,
    messages: &[Message],
) -> usize {
    let mut failures = 0;
    for message in messages {
        if let Err(e) = handle_message_delete(ctx, account_id, message).await {
            error!(
                account_id,
                message_id = %message.id,
                error = %e,
                "failed to bridge one bulk deletion"
            );
            failures += 1;
        }
    }
    failures
}

pub async fn handle_typing(
    ctx: &PuppetContext,
    account_id: &str,
    channel: &Channel,
    user: &User,
    typing: bool,
) -> Result<()> {
    if ctx.session(account_id).is_none() {
        return Ok(());
    }
    let Some(params) = channel_params(account_id, channel, user) else {
        return Ok(());
    };
    ctx.bridge.set_user_typing(&params, typing).await?;
    Ok(())
}

/// Bridge presence for a remote online status.
pub fn presence_for(status: OnlineStatus) -> Presence {
    match status {
        OnlineStatus::Idle | OnlineStatus::Dnd => Presence::Unavailable,
        OnlineStatus::Offline => Presence::Offline,
        OnlineStatus::Online | OnlineStatus::Invisible => Presence::Online,
    }
}

pub async fn handle_presence(
    ctx: &PuppetContext,
    account_id: &str,
    user: &User,
    status: OnlineStatus,
    activity: Option<&str>,
) -> Result<()> {
    if ctx.session(account_id).is_none() {
        return Ok(());
    }
    let participant = remote_participant(account_id, user);
    ctx.bridge
        .set_user_presence(&participant, presence_for(status))
        .await?;
    ctx.bridge
        .set_user_status(&participant, activity.unwrap_or_default())
        .await?;
    Ok(())
}

pub async fn handle_reaction(
    ctx: &PuppetContext,
    account_id: &str,
    reaction: &Reaction,
    user: &User,
) -> Result<()> {
    let Some(session) = ctx.session(account_id) else {
        return Ok(());
    };
    if reaction.me || session.own_user_id().as_deref() == Some(user.id.as_str()) {
        debug!(account_id, message_id = %reaction.message.id, "dropping own reaction");
        return Ok(());
    }
    let channel = &reaction.message.channel;
    let Some(params) = channel_params(account_id, channel, user) else {
        return Ok(());
    };
    if !ctx.scope.in_scope(account_id, channel).await {
        let room_id = &params.conversation.room_id;
        info!(account_id, room_id = %room_id, "unhandled channel, dropping reaction");
        return Ok(());
    }
    ctx.send_lock.wait(&params.conversation.lock_key()).await;
    ctx.bridge
        .receive_reaction(&params, &reaction.message.id, &reaction.emoji)
        .await?;
    Ok(())
}
