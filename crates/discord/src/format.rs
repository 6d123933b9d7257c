//! Seam to markup translation.
//!
//! A [`MessageFormatter`] turns remote messages into bridge content and
//! bridge intents into remote text. It looks up users, channels and emoji
//! through callbacks bound to one account.

use std::sync::LazyLock;

use {async_trait::async_trait, regex::Regex};

use marionette_channels::{MessageContent, MessageIntent};

use crate::{
    context::PuppetContext,
    emoji::resolve_emoji,
    model::Message,
    resolve::{resolve_conversation, resolve_participant},
};

/// User, channel and custom emoji mentions (`<@id>`, `<#id>`, `<a:name:id>`).
#[allow(clippy::expect_used)]
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:@!?(?P<user>\d+)|#(?P<chan>\d+)|a?:(?P<ename>\w+):\d+)>")
        .expect("mention pattern is a valid regex")
});

/// A mentioned user or channel as known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionTarget {
    pub local_id: String,
    pub name: String,
}

/// Lookups available while formatting a remote message.
#[async_trait]
pub trait InboundCallbacks: Send + Sync {
    async fn user(&self, user_id: &str) -> Option<MentionTarget>;
    async fn channel(&self, channel_id: &str) -> Option<MentionTarget>;
    /// Bridge content URI of a custom emoji.
    async fn emoji(&self, name: &str, animated: bool, emoji_id: &str) -> Option<String>;
}

/// Lookups available while formatting a bridge intent.
#[async_trait]
pub trait OutboundCallbacks: Send + Sync {
    /// Remote user id behind a bridge-local user id.
    async fn remote_user_id(&self, local_id: &str) -> Option<String>;
}

#[async_trait]
pub trait MessageFormatter: Send + Sync {
    async fn to_bridge(&self, message: &Message, callbacks: &dyn InboundCallbacks)
    -> MessageContent;

    async fn to_discord(&self, intent: &MessageIntent, callbacks: &dyn OutboundCallbacks) -> String;
}

/// Passthrough formatter: no markup, mentions replaced by names.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

#[async_trait]
impl MessageFormatter for PlainFormatter {
    async fn to_bridge(
        &self,
        message: &Message,
        callbacks: &dyn InboundCallbacks,
    ) -> MessageContent {
        enum Token {
            User(String),
            Channel(String),
            Emoji(String),
        }

        let content = &message.content;
        let tokens: Vec<(std::ops::Range<usize>, Token)> = MENTION_RE
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let token = if let Some(id) = caps.name("user") {
                    Token::User(id.as_str().to_string())
                } else if let Some(id) = caps.name("chan") {
                    Token::Channel(id.as_str().to_string())
                } else {
                    Token::Emoji(caps.name("ename")?.as_str().to_string())
                };
                Some((whole.range(), token))
            })
            .collect();

        let mut body = String::with_capacity(content.len());
        let mut last = 0;
        for (range, token) in tokens {
            body.push_str(&content[last..range.start]);
            let replacement = match token {
                Token::User(id) => callbacks.user(&id).await.map(|u| format!("@{}", u.name)),
                Token::Channel(id) => callbacks
                    .channel(&id)
                    .await
                    .map(|c| format!("#{}", c.name.trim_start_matches('#'))),
                Token::Emoji(name) => Some(format!(":{name}:")),
            };
            body.push_str(replacement.as_deref().unwrap_or(&content[range.clone()]));
            last = range.end;
        }
        body.push_str(&content[last..]);
        MessageContent::plain(body)
    }

    async fn to_discord(
        &self,
        intent: &MessageIntent,
        _callbacks: &dyn OutboundCallbacks,
    ) -> String {
        intent.body.clone()
    }
}

/// Callbacks bound to one account.
pub struct PuppetCallbacks<'a> {
    ctx: &'a PuppetContext,
    account_id: &'a str,
}

impl<'a> PuppetCallbacks<'a> {
    pub fn new(ctx: &'a PuppetContext, account_id: &'a str) -> Self {
        Self { ctx, account_id }
    }
}

#[async_trait]
impl InboundCallbacks for PuppetCallbacks<'_> {
    async fn user(&self, user_id: &str) -> Option<MentionTarget> {
        let local_id = self
            .ctx
            .bridge
            .participant_local_id(self.account_id, user_id)
            .await
            .ok()?;
        let name = resolve_participant(self.ctx, self.account_id, user_id)
            .await
            .map_or_else(|| local_id.clone(), |p| p.name);
        Some(MentionTarget { local_id, name })
    }

    async fn channel(&self, channel_id: &str) -> Option<MentionTarget> {
        let conversation = resolve_conversation(self.ctx, self.account_id, channel_id).await?;
        let local_id = self
            .ctx
            .bridge
            .conversation_local_id(&conversation)
            .await
            .ok()?;
        let name = conversation.name.unwrap_or_else(|| channel_id.to_string());
        Some(MentionTarget { local_id, name })
    }

    async fn emoji(&self, name: &str, animated: bool, emoji_id: &str) -> Option<String> {
        resolve_emoji(self.ctx, name, animated, emoji_id).await
    }
}

#[async_trait]
impl OutboundCallbacks for PuppetCallbacks<'_> {
    async fn remote_user_id(&self, local_id: &str) -> Option<String> {
        self.ctx
            .bridge
            .participant_remote_id(self.account_id, local_id)
            .await
            .ok()
            .flatten()
    }
}
