use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use {crate::definitions as m, metrics::counter};

use marionette_channels::{BridgeOutbound, FileIntent, MessageIntent, RemoteConversation};

use crate::{
    Error, Result,
    context::PuppetContext,
    format::PuppetCallbacks,
    media::{filename_for_media, is_image},
    model::{Channel, Embed, EmbedAuthor, Message, OutgoingMessage},
    resolve::channel_by_room_id,
    state::Session,
};

/// Outbound message sender for bridge-originated intents.
///
/// Every remote mutation happens while holding the send lock of the
/// destination conversation, and every message it creates is recorded
/// before the lock is released.
#[derive(Clone)]
pub struct DiscordOutbound {
    pub(crate) ctx: PuppetContext,
}

impl DiscordOutbound {
    pub fn new(ctx: PuppetContext) -> Self {
        Self { ctx }
    }

    /// Live session and destination channel, or `None` to drop the intent.
    async fn target(&self, conversation: &RemoteConversation) -> Option<(Session, Channel)> {
        let account_id = conversation.account_id.as_str();
        let Some(session) = self.ctx.session(account_id) else {
            debug!(account_id, "no session, dropping outbound intent");
            return None;
        };
        let Some(channel) =
            channel_by_room_id(session.client.as_ref(), &conversation.room_id).await
        else {
            warn!(account_id, room_id = %conversation.room_id, "channel not found");
            return None;
        };
        Some((session, channel))
    }

    /// Send under the conversation's lock and record what was created.
    async fn send_recorded(
        &self,
        session: &Session,
        conversation: &RemoteConversation,
        channel: &Channel,
        bridge_event_id: &str,
        message: OutgoingMessage,
    ) -> Result<()> {
        let _guard = self.ctx.send_lock.acquire(&conversation.lock_key()).await;
        let sent = match session.client.send_message(channel.id(), message).await {
            Ok(sent) => sent,
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(m::SEND_ERRORS_TOTAL, "op" => "send").increment(1);
                return Err(e);
            },
        };
        self.record(session, bridge_event_id, &sent).await
    }

    async fn record(
        &self,
        session: &Session,
        bridge_event_id: &str,
        sent: &[Message],
    ) -> Result<()> {
        // Every id enters the ledger before any bridge call can fail.
        for message in sent {
            session.sent.record(message.id.clone());
        }
        #[cfg(feature = "metrics")]
        counter!(m::MESSAGES_SENT_TOTAL).increment(sent.len() as u64);

        let mut first_error = None;
        for message in sent {
            if let Err(e) = self
                .ctx
                .bridge
                .record_event_id(&session.account_id, bridge_event_id, &message.id)
                .await
            {
                warn!(
                    account_id = %session.account_id,
                    message_id = %message.id,
                    error = %e,
                    "failed to record bridge event id"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn format(&self, conversation: &RemoteConversation, intent: &MessageIntent) -> String {
        let callbacks = PuppetCallbacks::new(&self.ctx, &conversation.account_id);
        self.ctx.formatter.to_discord(intent, &callbacks).await
    }

    pub async fn send_text(
        &self,
        conversation: &RemoteConversation,
        intent: &MessageIntent,
    ) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let text = self.format(conversation, intent).await;
        self.send_recorded(
            &session,
            conversation,
            &channel,
            &intent.event_id,
            OutgoingMessage::Text(text),
        )
        .await
    }

    /// Upload natively when small enough, otherwise link to the file.
    pub async fn send_file(
        &self,
        conversation: &RemoteConversation,
        intent: &FileIntent,
    ) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let max_size = self.ctx.config.max_file_size;
        let mime_type = intent.mime_type.as_deref();

        if intent.size.unwrap_or(0) <= max_size {
            match self.ctx.media.fetch(&intent.url).await {
                Ok(data) if data.len() as u64 <= max_size => {
                    let filename = filename_for_media(Some(&intent.filename), mime_type);
                    let upload = OutgoingMessage::File { data, filename };
                    return self
                        .send_recorded(&session, conversation, &channel, &intent.event_id, upload)
                        .await;
                },
                Ok(data) => debug!(size = data.len(), "file too large to upload, linking instead"),
                Err(e) => {
                    warn!(url = %intent.url, error = %e, "failed to fetch file, linking instead")
                },
            }
        }

        let fallback = if mime_type.is_some_and(is_image) && session.supports_embeds() {
            OutgoingMessage::Embed {
                content: String::new(),
                embed: Embed {
                    title: Some(intent.filename.clone()),
                    image_url: Some(intent.url.clone()),
                    ..Default::default()
                },
            }
        } else {
            OutgoingMessage::Text(format!("Uploaded File: [{}]({})", intent.filename, intent.url))
        };
        self.send_recorded(&session, conversation, &channel, &intent.event_id, fallback)
            .await
    }

    pub async fn edit(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let Some(original) = session.client.fetch_message(channel.id(), message_id).await? else {
            warn!(account_id = %session.account_id, message_id, "message to edit not found");
            return Err(Error::not_found("message", message_id));
        };
        let text = self.format(conversation, intent).await;

        let _guard = self.ctx.send_lock.acquire(&conversation.lock_key()).await;
        let edited = session
            .client
            .edit_message(channel.id(), &original.id, &text)
            .await?;
        self.record(&session, &intent.event_id, std::slice::from_ref(&edited))
            .await
    }

    /// Quote the original with a preview card, or inline when the account
    /// cannot send embeds.
    pub async fn reply(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let text = self.format(conversation, intent).await;
        let message = match session.client.fetch_message(channel.id(), message_id).await? {
            None => {
                debug!(
                    account_id = %session.account_id,
                    message_id,
                    "reply target gone, sending plain text"
                );
                OutgoingMessage::Text(text)
            },
            Some(original) => {
                let embed = reply_embed(&original);
                if session.supports_embeds() {
                    OutgoingMessage::Embed {
                        content: text,
                        embed,
                    }
                } else {
                    let quote = embed.description.unwrap_or_default();
                    OutgoingMessage::Text(format!("{text}\n>>> {quote}"))
                }
            },
        };
        self.send_recorded(&session, conversation, &channel, &intent.event_id, message)
            .await
    }

    /// Delete a remote message. Already gone counts as done.
    pub async fn redact(&self, conversation: &RemoteConversation, message_id: &str) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let Some(message) = session.client.fetch_message(channel.id(), message_id).await? else {
            debug!(message_id, "message already deleted");
            return Ok(());
        };
        let _guard = self.ctx.send_lock.acquire(&conversation.lock_key()).await;
        match session.client.delete_message(channel.id(), &message.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(message_id, "message already deleted");
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    pub async fn react(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        reaction: &str,
    ) -> Result<()> {
        let Some((session, channel)) = self.target(conversation).await else {
            return Ok(());
        };
        let Some(message) = session.client.fetch_message(channel.id(), message_id).await? else {
            debug!(message_id, "message to react to not found");
            return Ok(());
        };
        let _guard = self.ctx.send_lock.acquire(&conversation.lock_key()).await;
        session
            .client
            .react(channel.id(), &message.id, reaction)
            .await
    }
}

/// Preview card quoting `original`.
pub fn reply_embed(original: &Message) -> Embed {
    let mut embed = Embed {
        description: Some(original.content.clone()),
        author: Some(EmbedAuthor {
            name: original.author.username.clone(),
            icon_url: original.author.avatar_url.clone(),
        }),
        timestamp: Some(original.created_at),
        ..Default::default()
    };
    // An embed with an author is a quote card of our own, not an image.
    if let Some(first) = original.embeds.first()
        && first.author.is_none()
        && let Some(image) = &first.image_url
    {
        embed.image_url = Some(image.clone());
    }
    if let Some(attachment) = original.attachments.first() {
        if attachment.height.is_some() {
            embed.image_url = Some(attachment.proxy_url.clone());
        } else {
            let link = format!("[{}]({})", attachment.filename, attachment.proxy_url);
            embed.description.get_or_insert_default().push_str(&link);
        }
    }
    embed
}

#[async_trait]
impl BridgeOutbound for DiscordOutbound {
    async fn send_text(
        &self,
        conversation: &RemoteConversation,
        intent: &MessageIntent,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::send_text(self, conversation, intent).await?)
    }

    async fn send_file(
        &self,
        conversation: &RemoteConversation,
        intent: &FileIntent,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::send_file(self, conversation, intent).await?)
    }

    async fn redact(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::redact(self, conversation, message_id).await?)
    }

    async fn edit(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::edit(self, conversation, message_id, intent).await?)
    }

    async fn reply(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::reply(self, conversation, message_id, intent).await?)
    }

    async fn react(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        reaction: &str,
    ) -> anyhow::Result<()> {
        Ok(DiscordOutbound::react(self, conversation, message_id, reaction).await?)
    }
}
