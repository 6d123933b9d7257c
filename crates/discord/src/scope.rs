use std::sync::Arc;

use tracing::warn;

use marionette_channels::ScopeStore;

use crate::model::Channel;

/// Decides which conversations are bridged.
///
/// Direct and group DMs always are; guild text channels only when their
/// guild is in the account's allowlist. The allowlist is read fresh on
/// every check.
#[derive(Clone)]
pub struct ScopePolicy {
    store: Arc<dyn ScopeStore>,
}

impl ScopePolicy {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ScopeStore> {
        &self.store
    }

    /// A failing store denies.
    pub async fn in_scope(&self, account_id: &str, channel: &Channel) -> bool {
        match channel {
            Channel::Dm { .. } | Channel::Group { .. } => true,
            Channel::Text { guild, .. } => {
                match self.store.is_group_bridged(account_id, &guild.id).await {
                    Ok(bridged) => bridged,
                    Err(e) => {
                        warn!(account_id, guild_id = %guild.id, error = %e, "scope lookup failed");
                        false
                    },
                }
            },
            Channel::Category { .. } | Channel::Other { .. } => false,
        }
    }

    pub async fn is_bridged(&self, account_id: &str, guild_id: &str) -> anyhow::Result<bool> {
        self.store.is_group_bridged(account_id, guild_id).await
    }

    pub async fn bridged_guilds(&self, account_id: &str) -> anyhow::Result<Vec<String>> {
        self.store.bridged_groups(account_id).await
    }

    pub async fn bridge_guild(&self, account_id: &str, guild_id: &str) -> anyhow::Result<()> {
        self.store.add_bridged_group(account_id, guild_id).await
    }

    pub async fn unbridge_guild(&self, account_id: &str, guild_id: &str) -> anyhow::Result<()> {
        self.store.remove_bridged_group(account_id, guild_id).await
    }
}
