//! Remote network entities as delivered by the client library.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Four-digit discriminator, `"0"` for migrated usernames.
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// `username#discriminator`, or the bare username for migrated accounts.
    pub fn tag(&self) -> String {
        if self.discriminator.is_empty() || self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }
}

/// A guild (community) the account is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Guild {
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id() == id)
    }

    pub fn member(&self, user_id: &str) -> Option<&User> {
        self.members.iter().find(|m| m.id == user_id)
    }
}

/// Minimal guild reference carried by guild channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A channel of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Channel {
    /// 1:1 direct message channel.
    Dm { id: String, recipient: User },
    /// Ad-hoc group DM.
    Group {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        icon_url: Option<String>,
    },
    /// Guild text channel.
    Text {
        id: String,
        name: String,
        guild: GuildRef,
        #[serde(default)]
        parent_id: Option<String>,
        /// Whether the account may view the channel.
        #[serde(default = "default_true")]
        viewable: bool,
    },
    /// Guild category grouping other channels.
    Category {
        id: String,
        name: String,
        guild: GuildRef,
        #[serde(default = "default_true")]
        viewable: bool,
    },
    /// Voice, stage, forum and anything else the bridge does not carry.
    Other { id: String },
}

fn default_true() -> bool {
    true
}

impl Channel {
    pub fn id(&self) -> &str {
        match self {
            Self::Dm { id, .. }
            | Self::Group { id, .. }
            | Self::Text { id, .. }
            | Self::Category { id, .. }
            | Self::Other { id } => id,
        }
    }
}

/// Message type; only regular messages are bridged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Default,
    Reply,
    /// Pins, joins, boosts and other system messages.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub proxy_url: String,
    pub filename: String,
    /// Set for images.
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// A rich embed, used both for remote messages and for outgoing preview
/// cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<EmbedAuthor>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel: Channel,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub message: Message,
    /// Unicode emoji or custom emoji name.
    pub emoji: String,
    /// Whether the logged-in account itself added this reaction.
    #[serde(default)]
    pub me: bool,
}

/// User online status as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

/// The account a client is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user: User,
}

impl CurrentUser {
    /// Bot accounts can send rich embeds; user accounts cannot.
    pub fn supports_embeds(&self) -> bool {
        self.user.bot
    }
}

/// A message about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text(String),
    /// Text with a rich embed attached.
    Embed { content: String, embed: Embed },
    /// A native file upload.
    File { data: Vec<u8>, filename: String },
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}
