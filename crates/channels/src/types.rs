//! Canonical, network-agnostic entities exchanged with the bridge.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix reserved for synthesized direct-conversation ids.
pub const DM_ROOM_PREFIX: &str = "dm-";

/// Build the synthesized room id for a 1:1 conversation with `user_id`.
pub fn dm_room_id(user_id: &str) -> String {
    format!("{DM_ROOM_PREFIX}{user_id}")
}

/// Extract the participant id from a synthesized `dm-<id>` room id.
///
/// Returns `None` for native ids.
pub fn dm_participant_id(room_id: &str) -> Option<&str> {
    room_id
        .strip_prefix(DM_ROOM_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Key of the send lock guarding one conversation of one account.
pub fn lock_key(account_id: &str, room_id: &str) -> String {
    format!("{account_id};{room_id}")
}

/// A conversation as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConversation {
    pub account_id: String,
    /// Native remote id, or `dm-<userId>` for 1:1 conversations.
    pub room_id: String,
    pub is_direct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl RemoteConversation {
    /// Reference to a conversation by id only, as the bridge hands it back.
    pub fn reference(account_id: impl Into<String>, room_id: impl Into<String>) -> Result<Self> {
        let room_id = room_id.into();
        if room_id.is_empty() {
            return Err(Error::invalid_input("room id must not be empty"));
        }
        Ok(Self {
            account_id: account_id.into(),
            is_direct: dm_participant_id(&room_id).is_some(),
            room_id,
            name: None,
            avatar_url: None,
        })
    }

    pub fn lock_key(&self) -> String {
        lock_key(&self.account_id, &self.room_id)
    }
}

/// A remote user as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParticipant {
    pub account_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Addressing information attached to every inbound bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveParams {
    pub conversation: RemoteConversation,
    pub participant: RemoteParticipant,
    /// Remote id of the event being forwarded, when there is one.
    pub event_id: Option<String>,
    /// Link back to the event on the remote network.
    pub external_url: Option<String>,
}

/// Formatted message body handed to the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    pub body: String,
    pub formatted_body: Option<String>,
    pub emote: bool,
    pub notice: bool,
}

impl MessageContent {
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Online state forwarded to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Unavailable,
    Offline,
}

/// Identity of the remote account a puppet is logged in as.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountIdentity {
    pub remote_user_id: String,
    /// Account metadata the bridge persists on the puppet's behalf.
    pub data: serde_json::Value,
}

/// A text intent originating on the bridge side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIntent {
    /// Opaque bridge event id, recorded against the resulting remote ids.
    pub event_id: String,
    pub body: String,
    pub formatted_body: Option<String>,
}

/// A file intent originating on the bridge side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIntent {
    pub event_id: String,
    /// Publicly fetchable URL of the bridge media.
    pub url: String,
    pub filename: String,
    pub mime_type: Option<String>,
    /// Size declared by the bridge, if known.
    pub size: Option<u64>,
}

/// One line of a directory listing returned to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectoryEntry {
    Category { name: String },
    Item { id: String, name: String },
}

impl DirectoryEntry {
    pub fn category(name: impl Into<String>) -> Self {
        Self::Category { name: name.into() }
    }

    pub fn item(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Item {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Item { id, .. } => Some(id),
            Self::Category { .. } => None,
        }
    }
}
