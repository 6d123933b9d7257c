use std::sync::Arc;

use marionette_channels::{
    BridgeSink, EmojiStore, ScopeStore, SendLock, store_memory::InMemoryStore,
};

use crate::{
    config::DiscordBridgeConfig,
    format::{MessageFormatter, PlainFormatter},
    media::{HttpMediaFetcher, MediaFetcher},
    scope::ScopePolicy,
    state::{AccountStateMap, Session},
};

/// Everything an event handler or outbound call needs, passed explicitly
/// together with the account id.
#[derive(Clone)]
pub struct PuppetContext {
    pub accounts: AccountStateMap,
    pub bridge: Arc<dyn BridgeSink>,
    pub scope: ScopePolicy,
    pub emoji: Arc<dyn EmojiStore>,
    pub send_lock: Arc<SendLock>,
    pub formatter: Arc<dyn MessageFormatter>,
    pub media: Arc<dyn MediaFetcher>,
    pub config: DiscordBridgeConfig,
}

impl PuppetContext {
    pub fn new(bridge: Arc<dyn BridgeSink>, scope: Arc<dyn ScopeStore>) -> Self {
        let config = DiscordBridgeConfig::default();
        Self {
            accounts: AccountStateMap::default(),
            bridge,
            scope: ScopePolicy::new(scope),
            emoji: Arc::new(InMemoryStore::new()),
            send_lock: Arc::new(SendLock::new(config.send_lock_timeout())),
            formatter: Arc::new(PlainFormatter),
            media: Arc::new(HttpMediaFetcher::new()),
            config,
        }
    }

    pub fn with_config(mut self, config: DiscordBridgeConfig) -> Self {
        self.send_lock = Arc::new(SendLock::new(config.send_lock_timeout()));
        self.config = config;
        self
    }

    pub fn with_emoji_store(mut self, store: Arc<dyn EmojiStore>) -> Self {
        self.emoji = store;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_media_fetcher(mut self, media: Arc<dyn MediaFetcher>) -> Self {
        self.media = media;
        self
    }

    /// Snapshot of the live session for `account_id`, if any.
    pub fn session(&self, account_id: &str) -> Option<Session> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.get(account_id).map(|state| state.session())
    }
}
