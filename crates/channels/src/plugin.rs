use {anyhow::Result, async_trait::async_trait};

use crate::types::{
    AccountIdentity, DirectoryEntry, FileIntent, MessageContent, MessageIntent, Presence,
    ReceiveParams, RemoteConversation, RemoteParticipant,
};

// ── Calls into the bridge ───────────────────────────────────────────────────

/// The external bridge framework, as seen by a puppet implementation.
///
/// The bridge owns local identities, the event-id ledger and content
/// storage; puppets only call these entry points.
#[async_trait]
pub trait BridgeSink: Send + Sync {
    async fn receive_message(&self, params: &ReceiveParams, content: MessageContent) -> Result<()>;

    /// Forward an edit of the remote message `original_id`.
    async fn receive_edit(
        &self,
        params: &ReceiveParams,
        original_id: &str,
        content: MessageContent,
    ) -> Result<()>;

    async fn receive_redact(&self, params: &ReceiveParams, message_id: &str) -> Result<()>;

    async fn receive_reaction(
        &self,
        params: &ReceiveParams,
        message_id: &str,
        key: &str,
    ) -> Result<()>;

    /// Forward a file the bridge should fetch itself from `url`.
    async fn receive_file_by_url(
        &self,
        params: &ReceiveParams,
        url: &str,
        filename: Option<&str>,
    ) -> Result<()>;

    async fn set_user_typing(&self, params: &ReceiveParams, typing: bool) -> Result<()>;

    async fn set_user_presence(&self, user: &RemoteParticipant, presence: Presence) -> Result<()>;

    async fn set_user_status(&self, user: &RemoteParticipant, status: &str) -> Result<()>;

    /// Publish the remote identity and metadata of a logged-in account.
    async fn set_account_identity(&self, account_id: &str, identity: &AccountIdentity)
    -> Result<()>;

    /// Post an informational status line for an account. No-op by default.
    async fn send_status_message(&self, _account_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Bridge-local id of a conversation.
    async fn conversation_local_id(&self, conversation: &RemoteConversation) -> Result<String>;

    /// Bridge-local id of a remote user.
    async fn participant_local_id(&self, account_id: &str, user_id: &str) -> Result<String>;

    /// Reverse of [`BridgeSink::participant_local_id`]; `None` when the local
    /// id is not a puppet of `account_id`.
    async fn participant_remote_id(&self, account_id: &str, local_id: &str)
    -> Result<Option<String>>;

    /// Store content on the bridge and return its content URI.
    async fn upload_media(&self, data: Vec<u8>, mime_type: &str) -> Result<String>;

    /// Public URL for a bridge content URI.
    fn media_url(&self, local_uri: &str) -> String;

    /// Associate a bridge event id with a remote message id it produced.
    async fn record_event_id(
        &self,
        account_id: &str,
        bridge_event_id: &str,
        remote_id: &str,
    ) -> Result<()>;
}

// ── Calls from the bridge ───────────────────────────────────────────────────

/// Bridge-originated intents pushed out to the remote network.
///
/// Every operation must record the remote ids it creates for echo
/// suppression before it returns.
#[async_trait]
pub trait BridgeOutbound: Send + Sync {
    async fn send_text(&self, conversation: &RemoteConversation, intent: &MessageIntent)
    -> Result<()>;

    async fn send_file(&self, conversation: &RemoteConversation, intent: &FileIntent) -> Result<()>;

    async fn redact(&self, conversation: &RemoteConversation, message_id: &str) -> Result<()>;

    /// Replace the content of the remote message `message_id`.
    async fn edit(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> Result<()>;

    /// Send `intent` as a reply quoting the remote message `message_id`.
    async fn reply(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        intent: &MessageIntent,
    ) -> Result<()>;

    async fn react(
        &self,
        conversation: &RemoteConversation,
        message_id: &str,
        reaction: &str,
    ) -> Result<()>;
}

/// Lookups the bridge performs when it needs to materialize entities.
#[async_trait]
pub trait BridgeDirectory: Send + Sync {
    /// Re-resolve a conversation the bridge only knows by id.
    async fn create_conversation(
        &self,
        conversation: &RemoteConversation,
    ) -> Result<Option<RemoteConversation>>;

    /// Re-resolve a participant the bridge only knows by id.
    async fn create_participant(
        &self,
        participant: &RemoteParticipant,
    ) -> Result<Option<RemoteParticipant>>;

    /// Room id of the direct conversation with `participant`, if reachable.
    async fn dm_room_for(&self, participant: &RemoteParticipant) -> Result<Option<String>>;

    async fn list_users(&self, account_id: &str) -> Result<Vec<DirectoryEntry>>;

    async fn list_conversations(&self, account_id: &str) -> Result<Vec<DirectoryEntry>>;
}

/// Reply channel for admin commands.
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

/// A remote network implementation hosting any number of puppet accounts.
#[async_trait]
pub trait PuppetPlugin: Send + Sync {
    /// Network identifier (e.g. "discord").
    fn id(&self) -> &str;

    /// Human-readable network name.
    fn name(&self) -> &str;

    /// Start (or restart) an account session.
    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()>;

    /// Tear down an account session.
    async fn stop_account(&mut self, account_id: &str) -> Result<()>;

    /// Get the outbound adapter for bridge-originated intents.
    fn outbound(&self) -> Option<&dyn BridgeOutbound>;

    /// Get the status adapter for health checks.
    fn status(&self) -> Option<&dyn PuppetStatus>;
}

/// Probe account session health.
#[async_trait]
pub trait PuppetStatus: Send + Sync {
    async fn probe(&self, account_id: &str) -> Result<PuppetHealthSnapshot>;
}

/// Account session health snapshot.
#[derive(Debug, Clone)]
pub struct PuppetHealthSnapshot {
    pub connected: bool,
    pub account_id: String,
    pub details: Option<String>,
}
