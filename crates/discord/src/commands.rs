//! Account-scoped admin commands: `<command> <account_id> [param]`.

use tracing::info;

use marionette_channels::{AccountIdentity, CommandSender, Paginator};

use crate::{
    Result, config::FRIENDS_MANAGEMENT_CONFIRMATION, context::PuppetContext, model::User,
    state::Session,
};

const HELP: &str = "Available commands:\n\
 - `listguilds <account>`: list guilds and their bridge status\n\
 - `bridgeguild <account> <guild>`: bridge every channel of a guild\n\
 - `unbridgeguild <account> <guild>`: stop bridging a guild\n\
 - `enablefriendsmanagement <account>`: allow managing friends\n\
 - `disablefriendsmanagement <account>`: stop managing friends\n\
 - `listfriends <account>`: list friends and pending requests\n\
 - `addfriend <account> <user>`: send a friend request\n\
 - `removefriend <account> <user>`: remove a friend\n";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub command: &'a str,
    pub account_id: &'a str,
    /// Everything after the account id, trimmed. May contain spaces.
    pub param: &'a str,
}

impl<'a> CommandLine<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        let (command, rest) = split_word(line);
        if command.is_empty() {
            return None;
        }
        let (account_id, param) = split_word(rest);
        Some(Self {
            command,
            account_id,
            param: param.trim(),
        })
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(char::is_whitespace).unwrap_or((s, ""))
}

/// Admin command handler bound to the puppet context.
#[derive(Clone)]
pub struct AdminCommands {
    ctx: PuppetContext,
}

impl AdminCommands {
    pub fn new(ctx: PuppetContext) -> Self {
        Self { ctx }
    }

    /// Run one command line, replying through `sender`.
    pub async fn execute(&self, line: &str, sender: &dyn CommandSender) -> Result<()> {
        let Some(cmd) = CommandLine::parse(line) else {
            sender.send(HELP).await?;
            return Ok(());
        };
        match cmd.command {
            "help" => sender.send(HELP).await?,
            "listguilds" => self.list_guilds(cmd.account_id, sender).await?,
            "bridgeguild" => self.bridge_guild(cmd.account_id, cmd.param, sender).await?,
            "unbridgeguild" => self.unbridge_guild(cmd.account_id, cmd.param, sender).await?,
            "enablefriendsmanagement" => {
                self.enable_friends_management(cmd.account_id, cmd.param, sender)
                    .await?
            },
            "disablefriendsmanagement" => {
                self.disable_friends_management(cmd.account_id, sender)
                    .await?
            },
            "listfriends" => self.list_friends(cmd.account_id, sender).await?,
            "addfriend" => self.add_friend(cmd.account_id, cmd.param, sender).await?,
            "removefriend" => self.remove_friend(cmd.account_id, cmd.param, sender).await?,
            other => {
                sender
                    .send(&format!("Unknown command `{other}`. Type `help` for a list."))
                    .await?
            },
        }
        Ok(())
    }

    async fn send_pages(&self, pager: Paginator, sender: &dyn CommandSender) -> Result<()> {
        for page in pager.finish() {
            sender.send(&page).await?;
        }
        Ok(())
    }

    pub async fn list_guilds(&self, account_id: &str, sender: &dyn CommandSender) -> Result<()> {
        let Some(session) = self.ctx.session(account_id) else {
            sender.send("Puppet not found!").await?;
            return Ok(());
        };
        let bridged = self.ctx.scope.bridged_guilds(account_id).await?;
        let limit = self.ctx.config.max_command_message_len;
        let mut pager = Paginator::with_header(limit, "Guilds:\n");
        for guild in session.client.guilds() {
            let marker = if bridged.contains(&guild.id) {
                " **bridged!**"
            } else {
                ""
            };
            pager.push(&format!(" - {} (`{}`){marker}\n", guild.name, guild.id));
        }
        self.send_pages(pager, sender).await
    }

    pub async fn bridge_guild(
        &self,
        account_id: &str,
        guild_id: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        let Some(session) = self.ctx.session(account_id) else {
            sender.send("Puppet not found!").await?;
            return Ok(());
        };
        let Some(guild) = session.client.guilds().into_iter().find(|g| g.id == guild_id) else {
            sender.send("Guild not found!").await?;
            return Ok(());
        };
        self.ctx.scope.bridge_guild(account_id, &guild.id).await?;
        info!(account_id, guild_id, "guild bridged");
        sender
            .send(&format!("Guild {} (`{}`) is now being bridged!", guild.name, guild.id))
            .await?;
        Ok(())
    }

    pub async fn unbridge_guild(
        &self,
        account_id: &str,
        guild_id: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        if self.ctx.session(account_id).is_none() {
            sender.send("Puppet not found!").await?;
            return Ok(());
        }
        if !self.ctx.scope.is_bridged(account_id, guild_id).await? {
            sender.send("Guild wasn't bridged!").await?;
            return Ok(());
        }
        self.ctx.scope.unbridge_guild(account_id, guild_id).await?;
        info!(account_id, guild_id, "guild unbridged");
        sender.send("Unbridged guild!").await?;
        Ok(())
    }

    /// Flip the friends-management flag and publish the updated metadata.
    async fn set_friends_management(&self, account_id: &str, enabled: bool) -> Result<()> {
        let identity = {
            let mut accounts = self.ctx.accounts.write().unwrap_or_else(|e| e.into_inner());
            let Some(state) = accounts.get_mut(account_id) else {
                return Ok(());
            };
            state.config.friends_management = enabled;
            AccountIdentity {
                remote_user_id: state.config.id.clone().unwrap_or_default(),
                data: serde_json::to_value(&state.config)?,
            }
        };
        self.ctx
            .bridge
            .set_account_identity(account_id, &identity)
            .await?;
        Ok(())
    }

    pub async fn enable_friends_management(
        &self,
        account_id: &str,
        param: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        let Some(session) = self.ctx.session(account_id) else {
            sender.send("Puppet not found!").await?;
            return Ok(());
        };
        if session.friends_management {
            sender.send("Friends management is already enabled.").await?;
            return Ok(());
        }
        if param == FRIENDS_MANAGEMENT_CONFIRMATION {
            self.set_friends_management(account_id, true).await?;
            info!(account_id, "friends management enabled");
            sender.send("Friends management enabled!").await?;
            return Ok(());
        }
        sender
            .send(&format!(
                "Using user accounts is against discords TOS. As this is required for friends \
                 management, you will be breaking discords TOS if you enable this feature. \
                 Development of it has already softlocked accounts. USE AT YOUR OWN RISK!\n\n\
                 If you want to enable friends management type `enablefriendsmanagement \
                 {account_id} {FRIENDS_MANAGEMENT_CONFIRMATION}`"
            ))
            .await?;
        Ok(())
    }

    pub async fn disable_friends_management(
        &self,
        account_id: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        let Some(session) = self.ctx.session(account_id) else {
            sender.send("Puppet not found!").await?;
            return Ok(());
        };
        if !session.friends_management {
            sender.send("Friends management is already disabled.").await?;
            return Ok(());
        }
        self.set_friends_management(account_id, false).await?;
        sender.send("Friends management disabled!").await?;
        Ok(())
    }

    /// Session of an account with friends management on; replies otherwise.
    async fn friends_session(
        &self,
        account_id: &str,
        sender: &dyn CommandSender,
    ) -> Result<Option<Session>> {
        let Some(session) = self.ctx.session(account_id) else {
            sender.send("Puppet not found!").await?;
            return Ok(None);
        };
        if !session.friends_management {
            sender
                .send(&format!(
                    "Friends management is disabled. Please type `enablefriendsmanagement \
                     {account_id}` to enable it"
                ))
                .await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn list_friends(&self, account_id: &str, sender: &dyn CommandSender) -> Result<()> {
        let Some(session) = self.friends_session(account_id, sender).await? else {
            return Ok(());
        };
        let client = session.client.as_ref();
        let limit = self.ctx.config.max_command_message_len;
        let mut pager = Paginator::with_header(limit, "Friends:\n");
        for user in client.friends() {
            let local_id = self
                .ctx
                .bridge
                .participant_local_id(account_id, &user.id)
                .await?;
            pager.push(&format!(" - {} (`{}`): {local_id}\n", user.username, user.id));
        }
        pager.push("\nIncoming friend requests:\n");
        push_users(&mut pager, &client.incoming_friend_requests());
        pager.push("\nOutgoing friend requests:\n");
        push_users(&mut pager, &client.outgoing_friend_requests());
        self.send_pages(pager, sender).await
    }

    pub async fn add_friend(
        &self,
        account_id: &str,
        query: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        let Some(session) = self.friends_session(account_id, sender).await? else {
            return Ok(());
        };
        match session.client.add_friend(query).await? {
            Some(user) => {
                sender
                    .send(&format!("Added/sent friend request to {}!", user.username))
                    .await?
            },
            None => sender.send("User not found").await?,
        }
        Ok(())
    }

    pub async fn remove_friend(
        &self,
        account_id: &str,
        user_id: &str,
        sender: &dyn CommandSender,
    ) -> Result<()> {
        let Some(session) = self.friends_session(account_id, sender).await? else {
            return Ok(());
        };
        match session.client.remove_friend(user_id).await? {
            Some(user) => {
                sender
                    .send(&format!("Removed {} as friend!", user.username))
                    .await?
            },
            None => sender.send("User not found").await?,
        }
        Ok(())
    }
}

fn push_users(pager: &mut Paginator, users: &[User]) {
    for user in users {
        pager.push(&format!(" - {} (`{}`)\n", user.username, user.id));
    }
}
