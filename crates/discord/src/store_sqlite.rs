//! SQLite-backed scope ledger and emoji cache using sqlx.

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
};

use marionette_channels::{EmojiStore, ScopeStore, StoredEmoji};

/// SQLite-backed persistence for bridged guilds and cached emoji.
pub struct SqliteScopeStore {
    pool: SqlitePool,
}

impl SqliteScopeStore {
    /// Create a store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to SQLite")?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScopeStore for SqliteScopeStore {
    async fn bridged_groups(&self, account_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT guild_id FROM discord_bridged_guilds WHERE account_id = ? ORDER BY guild_id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("guild_id")).collect())
    }

    async fn is_group_bridged(&self, account_id: &str, group_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM discord_bridged_guilds WHERE account_id = ? AND guild_id = ?",
        )
        .bind(account_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn add_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()> {
        if group_id.is_empty() {
            anyhow::bail!("guild id must not be empty");
        }
        sqlx::query(
            "INSERT INTO discord_bridged_guilds (account_id, guild_id) VALUES (?, ?)
             ON CONFLICT(account_id, guild_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_bridged_group(&self, account_id: &str, group_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM discord_bridged_guilds WHERE account_id = ? AND guild_id = ?")
            .bind(account_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EmojiStore for SqliteScopeStore {
    async fn get_emoji(&self, emoji_id: &str) -> Result<Option<StoredEmoji>> {
        let row = sqlx::query(
            "SELECT emoji_id, name, animated, local_uri FROM discord_emoji WHERE emoji_id = ?",
        )
        .bind(emoji_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| StoredEmoji {
            emoji_id: r.get("emoji_id"),
            name: r.get("name"),
            animated: r.get::<i64, _>("animated") != 0,
            local_uri: r.get("local_uri"),
        }))
    }

    async fn set_emoji(&self, emoji: StoredEmoji) -> Result<()> {
        sqlx::query(
            "INSERT INTO discord_emoji (emoji_id, name, animated, local_uri) VALUES (?, ?, ?, ?)
             ON CONFLICT(emoji_id) DO UPDATE SET
                name = excluded.name,
                animated = excluded.animated,
                local_uri = excluded.local_uri",
        )
        .bind(&emoji.emoji_id)
        .bind(&emoji.name)
        .bind(i64::from(emoji.animated))
        .bind(&emoji.local_uri)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
