//! Discord puppet implementation for the marionette bridge.
//!
//! Each bridged account gets one [`state::AccountState`] holding its remote
//! client and dedup ledger. Remote events flow through [`inbound`] into the
//! bridge; bridge intents flow through [`outbound::DiscordOutbound`] to the
//! network. Both sides serialize on the shared send lock so an outbound
//! message is always recorded before its echo is checked.

pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod definitions;
pub mod directory;
pub mod emoji;
pub mod error;
pub mod format;
pub mod inbound;
pub mod media;
pub mod model;
pub mod outbound;
pub mod plugin;
pub mod resolve;
pub mod scope;
pub mod state;
pub mod store_sqlite;

#[cfg(test)]
mod test_support;

pub use {
    client::{Connection, DiscordClient, DiscordConnector, DiscordEvent},
    commands::AdminCommands,
    config::{DiscordAccountConfig, DiscordBridgeConfig},
    context::PuppetContext,
    error::{Error, Result},
    format::{MessageFormatter, PlainFormatter},
    media::{HttpMediaFetcher, MediaFetcher},
    outbound::DiscordOutbound,
    plugin::DiscordPuppetPlugin,
    store_sqlite::SqliteScopeStore,
};

/// Run database migrations for the discord crate.
///
/// This creates the `discord_bridged_guilds` and `discord_emoji` tables.
/// Should be called at application startup when using [`SqliteScopeStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
