//! Seam to the remote network's client library.
//!
//! The wire protocol, gateway reconnects and rate limiting live behind these
//! traits; the bridge core only reads the client's caches and issues the
//! handful of REST calls below.

use std::sync::Arc;

use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{
    Result,
    config::DiscordAccountConfig,
    model::{Channel, CurrentUser, Guild, Message, OnlineStatus, OutgoingMessage, Reaction, User},
};

/// A logged-in remote client for one account.
#[async_trait]
pub trait DiscordClient: Send + Sync {
    /// The account this client is logged in as, once the handshake is done.
    fn current_user(&self) -> Option<CurrentUser>;

    /// Guilds the account is a member of, with members and channels.
    fn guilds(&self) -> Vec<Guild>;

    /// Channel from the client-wide cache (DMs, group DMs, guild channels).
    fn cached_channel(&self, id: &str) -> Option<Channel>;

    /// All channels in the client-wide cache.
    fn cached_channels(&self) -> Vec<Channel>;

    /// Users the client has seen, whether or not they share a guild.
    fn cached_users(&self) -> Vec<User>;

    fn friends(&self) -> Vec<User>;

    fn incoming_friend_requests(&self) -> Vec<User> {
        Vec::new()
    }

    fn outgoing_friend_requests(&self) -> Vec<User> {
        Vec::new()
    }

    /// Fetch a user by id from the network; `Ok(None)` if unknown.
    async fn fetch_user(&self, id: &str) -> Result<Option<User>>;

    /// Open (or return the existing) DM channel with `user_id`. Idempotent.
    async fn create_dm(&self, user_id: &str) -> Result<Channel>;

    /// Send a message; large payloads may be split into several messages.
    async fn send_message(&self, channel_id: &str, message: OutgoingMessage)
    -> Result<Vec<Message>>;

    /// Fetch a message; `Ok(None)` if it no longer exists.
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Result<Option<Message>>;

    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str)
    -> Result<Message>;

    /// Delete a message. A missing message yields a not-found error.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    /// Send a friend request by user id or `name#discriminator`.
    async fn add_friend(&self, _query: &str) -> Result<Option<User>> {
        Ok(None)
    }

    async fn remove_friend(&self, _user_id: &str) -> Result<Option<User>> {
        Ok(None)
    }

    /// Close the connection. Further calls may fail.
    async fn destroy(&self);
}

/// Events delivered by a client's gateway connection.
#[derive(Debug, Clone)]
pub enum DiscordEvent {
    Ready(CurrentUser),
    MessageCreate(Message),
    MessageUpdate {
        old: Message,
        new: Message,
    },
    MessageDelete(Message),
    MessageDeleteBulk(Vec<Message>),
    TypingStart {
        channel: Channel,
        user: User,
    },
    TypingStop {
        channel: Channel,
        user: User,
    },
    PresenceUpdate {
        user: User,
        status: OnlineStatus,
        /// Name of the current activity ("Playing …"), if any.
        activity: Option<String>,
    },
    ReactionAdd {
        reaction: Reaction,
        user: User,
    },
}

impl DiscordEvent {
    /// Short name used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::MessageCreate(_) => "message",
            Self::MessageUpdate { .. } => "message_update",
            Self::MessageDelete(_) => "message_delete",
            Self::MessageDeleteBulk(_) => "message_delete_bulk",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::PresenceUpdate { .. } => "presence_update",
            Self::ReactionAdd { .. } => "reaction_add",
        }
    }
}

/// A connected client together with its event stream.
pub struct Connection {
    pub client: Arc<dyn DiscordClient>,
    pub events: mpsc::Receiver<DiscordEvent>,
}

/// Constructs clients and issues the login for new sessions.
#[async_trait]
pub trait DiscordConnector: Send + Sync {
    async fn connect(&self, account_id: &str, config: &DiscordAccountConfig) -> Result<Connection>;
}
