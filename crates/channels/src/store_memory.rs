//! In-memory stores for tests and embedders without a database.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
};

use {anyhow::Result, async_trait::async_trait};

use crate::{
    Error,
    store::{EmojiStore, ScopeStore, StoredEmoji},
};

/// `HashMap`-backed implementation of both bridge stores. No persistence.
#[derive(Default)]
pub struct InMemoryStore {
    groups: Mutex<HashMap<String, BTreeSet<String>>>,
    emoji: Mutex<HashMap<String, StoredEmoji>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeStore for InMemoryStore {
    async fn bridged_groups(&self, account_id: &str) -> Result<Vec<String>> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        Ok(groups
            .get(account_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn is_group_bridged(&self, account_id: &str, group_id: &str) -> Result<bool> {
        let groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        Ok(groups
            .get(account_id)
            .is_some_and(|set| set.contains(group_id)))
    }

    async fn add_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()> {
        if group_id.is_empty() {
            return Err(Error::invalid_input("group id must not be empty").into());
        }
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups
            .entry(account_id.to_string())
            .or_default()
            .insert(group_id.to_string());
        Ok(())
    }

    async fn remove_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()> {
        let mut groups = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = groups.get_mut(account_id) {
            set.remove(group_id);
        }
        Ok(())
    }
}

#[async_trait]
impl EmojiStore for InMemoryStore {
    async fn get_emoji(&self, emoji_id: &str) -> Result<Option<StoredEmoji>> {
        let emoji = self.emoji.lock().unwrap_or_else(|e| e.into_inner());
        Ok(emoji.get(emoji_id).cloned())
    }

    async fn set_emoji(&self, emoji: StoredEmoji) -> Result<()> {
        let mut cache = self.emoji.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(emoji.emoji_id.clone(), emoji);
        Ok(())
    }
}
