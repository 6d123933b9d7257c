//! Bridge-facing building blocks shared by every puppet network.
//!
//! A puppet implementation consumes the external bridge through
//! [`BridgeSink`], serves bridge-originated intents through
//! [`BridgeOutbound`] and [`BridgeDirectory`], and uses [`SendLock`] plus
//! [`SentLedger`] to keep its own messages from being re-ingested.

pub mod error;
pub mod ledger;
pub mod pagination;
pub mod plugin;
pub mod send_lock;
pub mod store;
pub mod store_memory;
pub mod types;

pub use {
    error::{Error, Result},
    ledger::SentLedger,
    pagination::Paginator,
    plugin::{
        BridgeDirectory, BridgeOutbound, BridgeSink, CommandSender, PuppetHealthSnapshot,
        PuppetPlugin, PuppetStatus,
    },
    send_lock::{DEFAULT_SEND_LOCK_TIMEOUT, SendLock, SendLockGuard},
    store::{EmojiStore, ScopeStore, StoredEmoji},
    types::{
        AccountIdentity, DirectoryEntry, FileIntent, MessageContent, MessageIntent, Presence,
        ReceiveParams, RemoteConversation, RemoteParticipant,
    },
};
