//! In-memory fakes of the remote client, the bridge and media downloads.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, chrono::DateTime, tokio::sync::mpsc};

use marionette_channels::{
    AccountIdentity, BridgeSink, CommandSender, MessageContent, Presence, ReceiveParams,
    RemoteConversation, RemoteParticipant, store_memory::InMemoryStore,
};

use crate::{
    Error, Result,
    client::{Connection, DiscordClient, DiscordConnector, DiscordEvent},
    config::DiscordAccountConfig,
    context::PuppetContext,
    media::MediaFetcher,
    model::{
        Attachment, Channel, CurrentUser, Guild, GuildRef, Message, MessageKind, OutgoingMessage,
        User,
    },
    state::AccountState,
};

// ── Builders ────────────────────────────────────────────────────────────────

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        username: name.into(),
        discriminator: "0".into(),
        avatar_url: None,
        bot: false,
    }
}

fn guild_ref(guild_id: &str) -> GuildRef {
    GuildRef {
        id: guild_id.into(),
        name: format!("Guild {guild_id}"),
        icon_url: None,
    }
}

pub fn guild(id: &str, members: Vec<User>, channels: Vec<Channel>) -> Guild {
    Guild {
        id: id.into(),
        name: format!("Guild {id}"),
        icon_url: None,
        members,
        channels,
    }
}

pub fn text_channel(id: &str, name: &str, guild_id: &str) -> Channel {
    Channel::Text {
        id: id.into(),
        name: name.into(),
        guild: guild_ref(guild_id),
        parent_id: None,
        viewable: true,
    }
}

pub fn child_channel(id: &str, name: &str, guild_id: &str, parent_id: &str) -> Channel {
    Channel::Text {
        id: id.into(),
        name: name.into(),
        guild: guild_ref(guild_id),
        parent_id: Some(parent_id.into()),
        viewable: true,
    }
}

pub fn category_channel(id: &str, name: &str, guild_id: &str) -> Channel {
    Channel::Category {
        id: id.into(),
        name: name.into(),
        guild: guild_ref(guild_id),
        viewable: true,
    }
}

pub fn voice_channel(id: &str) -> Channel {
    Channel::Other { id: id.into() }
}

pub fn dm_channel(id: &str, recipient: User) -> Channel {
    Channel::Dm {
        id: id.into(),
        recipient,
    }
}

pub fn group_channel(id: &str, name: &str) -> Channel {
    Channel::Group {
        id: id.into(),
        name: Some(name.into()),
        icon_url: None,
    }
}

pub fn message(id: &str, channel: Channel, author: User, content: &str) -> Message {
    Message {
        id: id.into(),
        channel,
        author,
        content: content.into(),
        kind: MessageKind::Default,
        attachments: Vec::new(),
        embeds: Vec::new(),
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

pub fn attachment(id: &str, filename: &str, height: Option<u32>) -> Attachment {
    Attachment {
        id: id.into(),
        url: format!("https://cdn.test/{id}"),
        proxy_url: format!("https://proxy.test/{id}"),
        filename: filename.into(),
        height,
    }
}

// ── Remote client ───────────────────────────────────────────────────────────

#[derive(Default)]
struct ClientInner {
    me: Option<User>,
    guilds: Vec<Guild>,
    friends: Vec<User>,
    remote_users: Vec<User>,
    cached_users: Vec<User>,
    cached_channels: Vec<Channel>,
    incoming: Vec<User>,
    outgoing: Vec<User>,
    messages: Vec<Message>,
    dms_opened: Vec<String>,
    sent: Vec<(String, OutgoingMessage)>,
    edits: Vec<(String, String)>,
    deleted: Vec<String>,
    reactions: Vec<(String, String)>,
    next_id: usize,
    split: usize,
    fail_sends: bool,
    deletes_not_found: bool,
    destroyed: bool,
}

#[derive(Default)]
pub struct FakeClient {
    inner: Mutex<ClientInner>,
}

impl FakeClient {
    fn inner(&self) -> std::sync::MutexGuard<'_, ClientInner> {
        self.inner.lock().unwrap()
    }

    pub fn set_current_user(&self, user: User) {
        self.inner().me = Some(user);
    }

    pub fn add_guild(&self, guild: Guild) {
        self.inner().guilds.push(guild);
    }

    pub fn push_friend(&self, user: User) {
        self.inner().friends.push(user);
    }

    /// A user only reachable through `fetch_user`.
    pub fn add_remote_user(&self, user: User) {
        self.inner().remote_users.push(user);
    }

    pub fn add_cached_user(&self, user: User) {
        self.inner().cached_users.push(user);
    }

    pub fn add_cached_channel(&self, channel: Channel) {
        self.inner().cached_channels.push(channel);
    }

    pub fn add_incoming_request(&self, user: User) {
        self.inner().incoming.push(user);
    }

    pub fn store_message(&self, message: Message) {
        self.inner().messages.push(message);
    }

    /// Make every send produce `n` remote messages.
    pub fn split_sends_into(&self, n: usize) {
        self.inner().split = n;
    }

    pub fn fail_sends(&self) {
        self.inner().fail_sends = true;
    }

    pub fn fail_deletes_with_not_found(&self) {
        self.inner().deletes_not_found = true;
    }

    pub fn dms_opened(&self) -> Vec<String> {
        self.inner().dms_opened.clone()
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.inner().sent.clone()
    }

    pub fn edits(&self) -> Vec<(String, String)> {
        self.inner().edits.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner().deleted.clone()
    }

    pub fn reactions(&self) -> Vec<(String, String)> {
        self.inner().reactions.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner().destroyed
    }

    fn known_user(inner: &ClientInner, user_id: &str) -> Option<User> {
        inner
            .guilds
            .iter()
            .flat_map(|g| g.members.iter())
            .chain(inner.friends.iter())
            .chain(inner.remote_users.iter())
            .find(|u| u.id == user_id)
            .cloned()
    }
}

#[async_trait]
impl DiscordClient for FakeClient {
    fn current_user(&self) -> Option<CurrentUser> {
        self.inner().me.clone().map(|user| CurrentUser { user })
    }

    fn guilds(&self) -> Vec<Guild> {
        self.inner().guilds.clone()
    }

    fn cached_channel(&self, id: &str) -> Option<Channel> {
        self.inner()
            .cached_channels
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    fn cached_channels(&self) -> Vec<Channel> {
        self.inner().cached_channels.clone()
    }

    fn cached_users(&self) -> Vec<User> {
        self.inner().cached_users.clone()
    }

    fn friends(&self) -> Vec<User> {
        self.inner().friends.clone()
    }

    fn incoming_friend_requests(&self) -> Vec<User> {
        self.inner().incoming.clone()
    }

    fn outgoing_friend_requests(&self) -> Vec<User> {
        self.inner().outgoing.clone()
    }

    async fn fetch_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .inner()
            .remote_users
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn create_dm(&self, user_id: &str) -> Result<Channel> {
        let mut inner = self.inner();
        inner.dms_opened.push(user_id.to_string());
        let recipient = Self::known_user(&inner, user_id).unwrap_or_else(|| user(user_id, user_id));
        Ok(dm_channel(&format!("dm-chan-{user_id}"), recipient))
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: OutgoingMessage,
    ) -> Result<Vec<Message>> {
        let mut inner = self.inner();
        if inner.fail_sends {
            return Err(Error::message("send failed"));
        }
        inner.sent.push((channel_id.to_string(), message));
        let author = inner.me.clone().unwrap_or_else(|| user("me", "puppet"));
        let mut created = Vec::new();
        for _ in 0..inner.split.max(1) {
            inner.next_id += 1;
            let id = format!("sent-{}", inner.next_id);
            let msg = crate::test_support::message(
                &id,
                Channel::Other {
                    id: channel_id.to_string(),
                },
                author.clone(),
                "",
            );
            inner.messages.push(msg.clone());
            created.push(msg);
        }
        Ok(created)
    }

    async fn fetch_message(&self, _channel_id: &str, message_id: &str) -> Result<Option<Message>> {
        Ok(self
            .inner()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn edit_message(
        &self,
        _channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message> {
        let mut inner = self.inner();
        inner
            .edits
            .push((message_id.to_string(), content.to_string()));
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::not_found("message", message_id))?;
        msg.content = content.to_string();
        Ok(msg.clone())
    }

    async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<()> {
        let mut inner = self.inner();
        if inner.deletes_not_found {
            return Err(Error::not_found("message", message_id));
        }
        inner.deleted.push(message_id.to_string());
        inner.messages.retain(|m| m.id != message_id);
        Ok(())
    }

    async fn react(&self, _channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        self.inner()
            .reactions
            .push((message_id.to_string(), emoji.to_string()));
        Ok(())
    }

    async fn add_friend(&self, query: &str) -> Result<Option<User>> {
        let mut inner = self.inner();
        let found = inner
            .remote_users
            .iter()
            .find(|u| u.id == query || u.username == query)
            .cloned();
        if let Some(user) = &found {
            inner.outgoing.push(user.clone());
        }
        Ok(found)
    }

    async fn remove_friend(&self, user_id: &str) -> Result<Option<User>> {
        let mut inner = self.inner();
        let pos = inner.friends.iter().position(|u| u.id == user_id);
        Ok(pos.map(|ix| inner.friends.remove(ix)))
    }

    async fn destroy(&self) {
        self.inner().destroyed = true;
    }
}

/// Hands out a fresh [`FakeClient`] per login.
#[derive(Default)]
pub struct FakeConnector {
    connections: Mutex<Vec<(Arc<FakeClient>, mpsc::Sender<DiscordEvent>)>>,
}

impl FakeConnector {
    pub fn connect_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(Arc<FakeClient>, mpsc::Sender<DiscordEvent>)> {
        self.connections.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DiscordConnector for FakeConnector {
    async fn connect(&self, _account_id: &str, _config: &DiscordAccountConfig) -> Result<Connection> {
        let client = Arc::new(FakeClient::default());
        let (tx, rx) = mpsc::channel(64);
        self.connections
            .lock()
            .unwrap()
            .push((Arc::clone(&client), tx));
        Ok(Connection {
            client,
            events: rx,
        })
    }
}

// ── Bridge ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct BridgeInner {
    calls: Vec<&'static str>,
    messages: Vec<(ReceiveParams, MessageContent)>,
    edits: Vec<(ReceiveParams, String, MessageContent)>,
    redactions: Vec<String>,
    files: Vec<(ReceiveParams, String, Option<String>)>,
    typing: Vec<(String, bool)>,
    presences: Vec<(String, Presence, String)>,
    identities: Vec<AccountIdentity>,
    status_messages: Vec<String>,
    uploads: Vec<(Vec<u8>, String)>,
    recorded: Vec<(String, String)>,
    failing_redactions: HashSet<String>,
    fail_event_ids: bool,
}

#[derive(Default)]
pub struct FakeBridge {
    inner: Mutex<BridgeInner>,
}

impl FakeBridge {
    fn inner(&self) -> std::sync::MutexGuard<'_, BridgeInner> {
        self.inner.lock().unwrap()
    }

    pub fn fail_redaction_of(&self, message_id: &str) {
        self.inner().failing_redactions.insert(message_id.to_string());
    }

    /// Make every `record_event_id` call fail.
    pub fn fail_event_id_records(&self) {
        self.inner().fail_event_ids = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.inner().calls.clone()
    }

    pub fn messages(&self) -> Vec<(ReceiveParams, MessageContent)> {
        self.inner().messages.clone()
    }

    pub fn edits(&self) -> Vec<(ReceiveParams, String, MessageContent)> {
        self.inner().edits.clone()
    }

    pub fn redactions(&self) -> Vec<String> {
        self.inner().redactions.clone()
    }

    pub fn files(&self) -> Vec<(ReceiveParams, String, Option<String>)> {
        self.inner().files.clone()
    }

    pub fn typing(&self) -> Vec<(String, bool)> {
        self.inner().typing.clone()
    }

    pub fn presences(&self) -> Vec<(String, Presence, String)> {
        self.inner().presences.clone()
    }

    pub fn identities(&self) -> Vec<AccountIdentity> {
        self.inner().identities.clone()
    }

    pub fn status_messages(&self) -> Vec<String> {
        self.inner().status_messages.clone()
    }

    pub fn uploads(&self) -> Vec<(Vec<u8>, String)> {
        self.inner().uploads.clone()
    }

    pub fn recorded(&self) -> Vec<(String, String)> {
        self.inner().recorded.clone()
    }
}

#[async_trait]
impl BridgeSink for FakeBridge {
    async fn receive_message(
        &self,
        params: &ReceiveParams,
        content: MessageContent,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("message");
        inner.messages.push((params.clone(), content));
        Ok(())
    }

    async fn receive_edit(
        &self,
        params: &ReceiveParams,
        original_id: &str,
        content: MessageContent,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("edit");
        inner
            .edits
            .push((params.clone(), original_id.to_string(), content));
        Ok(())
    }

    async fn receive_redact(&self, _params: &ReceiveParams, message_id: &str) -> anyhow::Result<()> {
        let mut inner = self.inner();
        if inner.failing_redactions.contains(message_id) {
            anyhow::bail!("bridge rejected redaction of {message_id}");
        }
        inner.calls.push("redact");
        inner.redactions.push(message_id.to_string());
        Ok(())
    }

    async fn receive_reaction(
        &self,
        _params: &ReceiveParams,
        _message_id: &str,
        _key: &str,
    ) -> anyhow::Result<()> {
        self.inner().calls.push("reaction");
        Ok(())
    }

    async fn receive_file_by_url(
        &self,
        params: &ReceiveParams,
        url: &str,
        filename: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("file");
        inner.files.push((
            params.clone(),
            url.to_string(),
            filename.map(str::to_string),
        ));
        Ok(())
    }

    async fn set_user_typing(&self, params: &ReceiveParams, typing: bool) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("typing");
        inner
            .typing
            .push((params.conversation.room_id.clone(), typing));
        Ok(())
    }

    async fn set_user_presence(
        &self,
        user: &RemoteParticipant,
        presence: Presence,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("presence");
        inner
            .presences
            .push((user.user_id.clone(), presence, String::new()));
        Ok(())
    }

    async fn set_user_status(&self, user: &RemoteParticipant, status: &str) -> anyhow::Result<()> {
        let mut inner = self.inner();
        inner.calls.push("status");
        if let Some(entry) = inner
            .presences
            .iter_mut()
            .rev()
            .find(|(id, ..)| *id == user.user_id)
        {
            entry.2 = status.to_string();
        }
        Ok(())
    }

    async fn set_account_identity(
        &self,
        _account_id: &str,
        identity: &AccountIdentity,
    ) -> anyhow::Result<()> {
        self.inner().identities.push(identity.clone());
        Ok(())
    }

    async fn send_status_message(&self, _account_id: &str, text: &str) -> anyhow::Result<()> {
        self.inner().status_messages.push(text.to_string());
        Ok(())
    }

    async fn conversation_local_id(
        &self,
        conversation: &RemoteConversation,
    ) -> anyhow::Result<String> {
        Ok(format!("room-{}", conversation.room_id))
    }

    async fn participant_local_id(&self, _account_id: &str, user_id: &str) -> anyhow::Result<String> {
        Ok(format!("puppet-{user_id}"))
    }

    async fn participant_remote_id(
        &self,
        _account_id: &str,
        local_id: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(local_id.strip_prefix("puppet-").map(str::to_string))
    }

    async fn upload_media(&self, data: Vec<u8>, mime_type: &str) -> anyhow::Result<String> {
        let mut inner = self.inner();
        inner.uploads.push((data, mime_type.to_string()));
        Ok(format!("mxc://bridge/{}", inner.uploads.len()))
    }

    fn media_url(&self, local_uri: &str) -> String {
        format!("https://bridge.test/{local_uri}")
    }

    async fn record_event_id(
        &self,
        _account_id: &str,
        bridge_event_id: &str,
        remote_id: &str,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner();
        if inner.fail_event_ids {
            anyhow::bail!("bridge rejected event id for {remote_id}");
        }
        inner
            .recorded
            .push((bridge_event_id.to_string(), remote_id.to_string()));
        Ok(())
    }
}

// ── Media & commands ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeMedia {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl FakeMedia {
    pub fn insert(&self, url: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(url.to_string(), data);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeMedia {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.files.lock().unwrap().get(url) {
            Some(data) => Ok(data.clone()),
            None => anyhow::bail!("HTTP 404 for {url}"),
        }
    }
}

#[derive(Default)]
pub struct RecordingSender {
    replies: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSender for RecordingSender {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

/// A context wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub ctx: PuppetContext,
    pub bridge: Arc<FakeBridge>,
    pub client: Arc<FakeClient>,
    pub media: Arc<FakeMedia>,
}

impl Harness {
    pub fn new() -> Self {
        let bridge = Arc::new(FakeBridge::default());
        let media = Arc::new(FakeMedia::default());
        let ctx = PuppetContext::new(bridge.clone(), Arc::new(InMemoryStore::new()))
            .with_media_fetcher(media.clone());
        Self {
            ctx,
            bridge,
            client: Arc::new(FakeClient::default()),
            media,
        }
    }

    /// Register a live session backed by `client`.
    pub fn add_account(&self, account_id: &str, client: Arc<FakeClient>) {
        let config = DiscordAccountConfig::default();
        let state = AccountState::new(account_id, client, config);
        self.ctx
            .accounts
            .write()
            .unwrap()
            .insert(account_id.to_string(), state);
    }
}
