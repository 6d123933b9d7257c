use {anyhow::Result, async_trait::async_trait, serde::Serialize};

/// Per-account allowlist of community (guild) ids whose conversations are
/// bridged.
///
/// Direct and ad-hoc group conversations are always in scope and are never
/// stored here. Adding a present id or removing an absent one is a no-op.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    async fn bridged_groups(&self, account_id: &str) -> Result<Vec<String>>;
    async fn is_group_bridged(&self, account_id: &str, group_id: &str) -> Result<bool>;
    async fn add_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()>;
    async fn remove_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()>;
}

/// A custom emoji already uploaded to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEmoji {
    pub emoji_id: String,
    pub name: String,
    pub animated: bool,
    /// Bridge content URI returned by the upload.
    pub local_uri: String,
}

/// Cache of custom emoji assets shared by every account.
#[async_trait]
pub trait EmojiStore: Send + Sync {
    async fn get_emoji(&self, emoji_id: &str) -> Result<Option<StoredEmoji>>;
    async fn set_emoji(&self, emoji: StoredEmoji) -> Result<()>;
}
