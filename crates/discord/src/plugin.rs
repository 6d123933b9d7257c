use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::ExposeSecret,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use {
    crate::definitions as m,
    metrics::{counter, gauge},
};

use marionette_channels::{
    BridgeDirectory, BridgeOutbound, DirectoryEntry, PuppetHealthSnapshot, PuppetPlugin,
    PuppetStatus, RemoteConversation, RemoteParticipant,
};

use crate::{
    client::{DiscordConnector, DiscordEvent},
    commands::AdminCommands,
    config::DiscordAccountConfig,
    context::PuppetContext,
    directory, inbound,
    outbound::DiscordOutbound,
    resolve,
    state::{AccountState, SessionStatus},
};

/// Discord puppet plugin: one live session per bridged account.
pub struct DiscordPuppetPlugin {
    ctx: PuppetContext,
    connector: Arc<dyn DiscordConnector>,
    outbound: DiscordOutbound,
    commands: AdminCommands,
}

impl DiscordPuppetPlugin {
    pub fn new(ctx: PuppetContext, connector: Arc<dyn DiscordConnector>) -> Self {
        Self {
            outbound: DiscordOutbound::new(ctx.clone()),
            commands: AdminCommands::new(ctx.clone()),
            ctx,
            connector,
        }
    }

    pub fn context(&self) -> &PuppetContext {
        &self.ctx
    }

    pub fn commands(&self) -> &AdminCommands {
        &self.commands
    }

    /// Get a shared reference to the outbound sender (for use outside the plugin).
    pub fn shared_outbound(&self) -> Arc<dyn BridgeOutbound> {
        Arc::new(self.outbound.clone())
    }

    /// List all active account IDs.
    pub fn account_ids(&self) -> Vec<String> {
        let accounts = self.ctx.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts.keys().cloned().collect()
    }

    pub fn session_status(&self, account_id: &str) -> Option<SessionStatus> {
        self.ctx.session(account_id).map(|s| s.status)
    }

    /// Get the config for a specific account (serialized to JSON).
    pub fn account_config(&self, account_id: &str) -> Option<serde_json::Value> {
        let accounts = self.ctx.accounts.read().unwrap_or_else(|e| e.into_inner());
        accounts
            .get(account_id)
            .and_then(|s| serde_json::to_value(&s.config).ok())
    }

    /// Update the in-memory metadata of an account without reconnecting.
    ///
    /// Identity learned at login is kept when the new config lacks it.
    pub fn update_account_config(
        &self,
        account_id: &str,
        config: serde_json::Value,
    ) -> Result<()> {
        let mut new_config: DiscordAccountConfig = serde_json::from_value(config)?;
        let mut accounts = self.ctx.accounts.write().unwrap_or_else(|e| e.into_inner());
        let Some(state) = accounts.get_mut(account_id) else {
            return Err(anyhow::anyhow!("account not found: {account_id}"));
        };
        if new_config.username.is_none() {
            new_config.username = state.config.username.take();
        }
        if new_config.id.is_none() {
            new_config.id = state.config.id.take();
        }
        state.config = new_config;
        Ok(())
    }

    #[cfg(feature = "metrics")]
    fn record_session_count(&self) {
        let count = self.ctx.accounts.read().unwrap_or_else(|e| e.into_inner()).len();
        gauge!(m::ACTIVE_SESSIONS).set(count as f64);
    }
}

/// Drain one session's events until cancelled or the stream ends.
///
/// Each event is handled in its own task so a slow or failing handler
/// never blocks the others.
async fn run_event_loop(
    ctx: PuppetContext,
    account_id: String,
    mut events: mpsc::Receiver<DiscordEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            info!(account_id = %account_id, "discord event stream closed");
            break;
        };
        let ctx = ctx.clone();
        let account_id = account_id.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { dispatch_event(&ctx, &account_id, event, &cancel).await });
    }
    debug!(account_id = %account_id, "discord event loop stopped");
}

/// Handle one event unless its account has been stopped in the meantime.
async fn dispatch_event(
    ctx: &PuppetContext,
    account_id: &str,
    event: DiscordEvent,
    cancel: &CancellationToken,
) {
    let kind = event.kind();
    if cancel.is_cancelled() {
        debug!(account_id, event = kind, "account stopped, skipping event");
        return;
    }
    if let Err(e) = inbound::handle_event(ctx, account_id, event).await {
        error!(account_id, event = kind, error = %e, "failed to handle discord event");
        #[cfg(feature = "metrics")]
        counter!(m::EVENT_ERRORS_TOTAL, "event" => kind).increment(1);
    }
}

#[async_trait]
impl PuppetPlugin for DiscordPuppetPlugin {
    fn id(&self) -> &str {
        "discord"
    }

    fn name(&self) -> &str {
        "Discord"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let dc_config: DiscordAccountConfig = serde_json::from_value(config)?;

        if dc_config.token.expose_secret().is_empty() {
            return Err(anyhow::anyhow!("discord token is required"));
        }

        if self.ctx.session(account_id).is_some() {
            info!(account_id, "replacing existing discord session");
            self.stop_account(account_id).await?;
        }

        info!(account_id, "starting discord account");
        let connection = self.connector.connect(account_id, &dc_config).await?;

        let state = AccountState::new(account_id, connection.client, dc_config);
        let cancel = state.cancel.clone();
        {
            let mut accounts = self.ctx.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.insert(account_id.to_string(), state);
        }
        #[cfg(feature = "metrics")]
        self.record_session_count();

        tokio::spawn(run_event_loop(
            self.ctx.clone(),
            account_id.to_string(),
            connection.events,
            cancel,
        ));
        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> Result<()> {
        let state = {
            let mut accounts = self.ctx.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.remove(account_id)
        };

        if let Some(state) = state {
            info!(account_id, "stopping discord account");
            state.cancel.cancel();
            state.client.destroy().await;
            #[cfg(feature = "metrics")]
            self.record_session_count();
        } else {
            warn!(account_id, "discord account not found");
        }

        Ok(())
    }

    fn outbound(&self) -> Option<&dyn BridgeOutbound> {
        Some(&self.outbound)
    }

    fn status(&self) -> Option<&dyn PuppetStatus> {
        Some(self)
    }
}

#[async_trait]
impl PuppetStatus for DiscordPuppetPlugin {
    async fn probe(&self, account_id: &str) -> Result<PuppetHealthSnapshot> {
        let snapshot = match self.ctx.session(account_id) {
            Some(session) => {
                let connected = session.status == SessionStatus::Ready;
                let details = match session.client.current_user() {
                    Some(me) => format!("User: {}", me.user.tag()),
                    None => "waiting for login".to_string(),
                };
                PuppetHealthSnapshot {
                    connected,
                    account_id: account_id.to_string(),
                    details: Some(details),
                }
            },
            None => PuppetHealthSnapshot {
                connected: false,
                account_id: account_id.to_string(),
                details: Some("account not started".into()),
            },
        };
        Ok(snapshot)
    }
}

#[async_trait]
impl BridgeDirectory for DiscordPuppetPlugin {
    async fn create_conversation(
        &self,
        conversation: &RemoteConversation,
    ) -> Result<Option<RemoteConversation>> {
        Ok(resolve::resolve_conversation(
            &self.ctx,
            &conversation.account_id,
            &conversation.room_id,
        )
        .await)
    }

    async fn create_participant(
        &self,
        participant: &RemoteParticipant,
    ) -> Result<Option<RemoteParticipant>> {
        Ok(
            resolve::resolve_participant(&self.ctx, &participant.account_id, &participant.user_id)
                .await,
        )
    }

    async fn dm_room_for(&self, participant: &RemoteParticipant) -> Result<Option<String>> {
        Ok(resolve::dm_room_for(&self.ctx, participant).await)
    }

    async fn list_users(&self, account_id: &str) -> Result<Vec<DirectoryEntry>> {
        Ok(directory::list_users(&self.ctx, account_id))
    }

    async fn list_conversations(&self, account_id: &str) -> Result<Vec<DirectoryEntry>> {
        Ok(directory::list_conversations(&self.ctx, account_id).await?)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{model::CurrentUser, test_support::*},
        std::time::Duration,
    };

    fn plugin() -> (Harness, DiscordPuppetPlugin, Arc<FakeConnector>) {
        let harness = Harness::new();
        let connector = Arc::new(FakeConnector::default());
        let plugin = DiscordPuppetPlugin::new(harness.ctx.clone(), connector.clone());
        (harness, plugin, connector)
    }

    fn config(token: &str) -> serde_json::Value {
        serde_json::json!({ "token": token })
    }

    /// Let spawned tasks run.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let (_harness, mut plugin, connector) = plugin();
        assert!(plugin.start_account("acc", config("")).await.is_err());
        assert_eq!(connector.connect_count(), 0);
        assert!(plugin.account_ids().is_empty());
    }

    #[tokio::test]
    async fn start_runs_events_through_the_inbound_handlers() {
        let (harness, mut plugin, connector) = plugin();
        plugin.start_account("acc", config("tok")).await.unwrap();
        assert_eq!(plugin.session_status("acc"), Some(SessionStatus::Starting));
        assert!(!plugin.probe("acc").await.unwrap().connected);

        let (client, events) = connector.last().unwrap();
        client.set_current_user(user("me", "puppet"));
        events
            .send(DiscordEvent::Ready(CurrentUser {
                user: user("me", "puppet"),
            }))
            .await
            .unwrap();
        settle().await;
        assert_eq!(plugin.session_status("acc"), Some(SessionStatus::Ready));
        assert!(plugin.probe("acc").await.unwrap().connected);
        assert_eq!(plugin.account_config("acc").unwrap()["id"], "me");

        let msg = message("1", dm_channel("d", user("2", "bob")), user("2", "bob"), "hi");
        events.send(DiscordEvent::MessageCreate(msg)).await.unwrap();
        settle().await;
        assert_eq!(harness.bridge.messages().len(), 1);
    }

    #[tokio::test]
    async fn events_are_skipped_once_the_account_is_cancelled() {
        let harness = Harness::new();
        harness.client.set_current_user(user("me", "puppet"));
        harness.add_account("acc", harness.client.clone());
        let event = |id: &str| {
            DiscordEvent::MessageCreate(message(
                id,
                dm_channel("d", user("2", "bob")),
                user("2", "bob"),
                "hi",
            ))
        };

        let cancel = CancellationToken::new();
        dispatch_event(&harness.ctx, "acc", event("1"), &cancel).await;
        assert_eq!(harness.bridge.messages().len(), 1);

        cancel.cancel();
        dispatch_event(&harness.ctx, "acc", event("2"), &cancel).await;
        assert_eq!(harness.bridge.messages().len(), 1);
    }

    #[tokio::test]
    async fn restart_replaces_the_session() {
        let (_harness, mut plugin, connector) = plugin();
        plugin.start_account("acc", config("one")).await.unwrap();
        let (first, first_events) = connector.last().unwrap();

        plugin.start_account("acc", config("two")).await.unwrap();
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(plugin.account_ids(), vec!["acc".to_string()]);
        assert!(first.is_destroyed());
        settle().await;
        assert!(first_events.is_closed());

        let (second, _) = connector.last().unwrap();
        assert!(!second.is_destroyed());
    }

    #[tokio::test]
    async fn stop_tears_down_and_tolerates_unknown_ids() {
        let (_harness, mut plugin, connector) = plugin();
        plugin.start_account("acc", config("tok")).await.unwrap();
        plugin.stop_account("acc").await.unwrap();
        plugin.stop_account("acc").await.unwrap();

        assert!(plugin.account_ids().is_empty());
        assert!(connector.last().unwrap().0.is_destroyed());
        assert!(!plugin.probe("acc").await.unwrap().connected);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let (_harness, mut plugin, _connector) = plugin();
        plugin.start_account("a", config("tok-a")).await.unwrap();
        plugin.start_account("b", config("tok-b")).await.unwrap();
        plugin.stop_account("a").await.unwrap();
        assert_eq!(plugin.account_ids(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn config_updates_keep_learned_identity() {
        let (_harness, mut plugin, _connector) = plugin();
        plugin
            .start_account("acc", serde_json::json!({ "token": "t", "id": "42" }))
            .await
            .unwrap();
        plugin
            .update_account_config(
                "acc",
                serde_json::json!({ "token": "t", "friends_management": true }),
            )
            .unwrap();
        let cfg = plugin.account_config("acc").unwrap();
        assert_eq!(cfg["id"], "42");
        assert_eq!(cfg["friends_management"], true);
        assert!(plugin.update_account_config("ghost", config("t")).is_err());
    }

    #[tokio::test]
    async fn directory_hooks_resolve_by_id() {
        let (_harness, mut plugin, connector) = plugin();
        plugin.start_account("acc", config("tok")).await.unwrap();
        let (client, _) = connector.last().unwrap();
        client.add_guild(guild("g1", vec![user("2", "bob")], vec![text_channel(
            "10", "general", "g1",
        )]));

        let conv = RemoteConversation::reference("acc", "10").unwrap();
        let created = plugin.create_conversation(&conv).await.unwrap().unwrap();
        assert_eq!(created.name.as_deref(), Some("#general - Guild g1"));

        let participant = RemoteParticipant {
            account_id: "acc".into(),
            user_id: "2".into(),
            name: String::new(),
            avatar_url: None,
        };
        assert_eq!(plugin.create_participant(&participant).await.unwrap().unwrap().name, "bob");
        assert_eq!(plugin.dm_room_for(&participant).await.unwrap().as_deref(), Some("dm-2"));

        let ghost = RemoteParticipant {
            user_id: "404".into(),
            ..participant
        };
        assert!(plugin.dm_room_for(&ghost).await.unwrap().is_none());
    }
}
