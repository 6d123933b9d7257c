use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tokio_util::sync::CancellationToken;

use marionette_channels::SentLedger;

use crate::{client::DiscordClient, config::DiscordAccountConfig};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Lifecycle of a session. A destroyed session is simply absent from the
/// map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Logged in, waiting for the ready event.
    Starting,
    Ready,
}

/// Per-account runtime state.
pub struct AccountState {
    pub account_id: String,
    pub client: Arc<dyn DiscordClient>,
    pub config: DiscordAccountConfig,
    pub status: SessionStatus,
    /// Remote ids this session sent and expects to see echoed.
    pub sent: Arc<SentLedger>,
    pub cancel: CancellationToken,
}

impl AccountState {
    pub fn new(
        account_id: impl Into<String>,
        client: Arc<dyn DiscordClient>,
        config: DiscordAccountConfig,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            client,
            config,
            status: SessionStatus::Starting,
            sent: Arc::new(SentLedger::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> Session {
        Session {
            account_id: self.account_id.clone(),
            client: Arc::clone(&self.client),
            sent: Arc::clone(&self.sent),
            friends_management: self.config.friends_management,
            status: self.status,
        }
    }
}

/// Cloned view of a session, safe to hold across `.await`.
#[derive(Clone)]
pub struct Session {
    pub account_id: String,
    pub client: Arc<dyn DiscordClient>,
    pub sent: Arc<SentLedger>,
    pub friends_management: bool,
    pub status: SessionStatus,
}

impl Session {
    /// Remote user id of the logged-in account, once known.
    pub fn own_user_id(&self) -> Option<String> {
        self.client.current_user().map(|me| me.user.id)
    }

    /// Whether the remote message `author_id`/`message_id` is an echo of
    /// something this session sent. Consumes the ledger entry if so.
    pub fn consume_echo(&self, author_id: &str, message_id: &str) -> bool {
        self.own_user_id().as_deref() == Some(author_id) && self.sent.consume(message_id)
    }

    pub fn supports_embeds(&self) -> bool {
        self.client
            .current_user()
            .is_some_and(|me| me.supports_embeds())
    }
}
