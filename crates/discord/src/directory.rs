//! Listings the bridge shows when an admin browses an account's users and
//! conversations.

use std::collections::HashSet;

use marionette_channels::DirectoryEntry;

use crate::{Result, context::PuppetContext, model::Channel};

/// Remote id of the network's system account.
const SYSTEM_USER_ID: &str = "1";

/// Users outside any guild first, then one category per guild with its
/// members. The account itself and the system user are left out.
pub fn list_users(ctx: &PuppetContext, account_id: &str) -> Vec<DirectoryEntry> {
    let Some(session) = ctx.session(account_id) else {
        return Vec::new();
    };
    let own_id = session.own_user_id();
    let hidden = |id: &str| id == SYSTEM_USER_ID || own_id.as_deref() == Some(id);

    let mut in_guilds = HashSet::new();
    let mut guild_entries = Vec::new();
    for guild in session.client.guilds() {
        guild_entries.push(DirectoryEntry::category(&guild.name));
        for member in &guild.members {
            if !hidden(&member.id) {
                in_guilds.insert(member.id.clone());
                guild_entries.push(DirectoryEntry::item(&member.id, &member.username));
            }
        }
    }

    let mut seen = HashSet::new();
    let mut entries: Vec<DirectoryEntry> = session
        .client
        .cached_users()
        .into_iter()
        .chain(session.client.friends())
        .filter(|u| !hidden(&u.id) && !in_guilds.contains(&u.id) && seen.insert(u.id.clone()))
        .map(|u| DirectoryEntry::item(u.id, u.username))
        .collect();
    entries.extend(guild_entries);
    entries
}

/// Group DMs first, then every bridged guild: its top-level text channels,
/// then one category per channel category with the text channels in it.
pub async fn list_conversations(
    ctx: &PuppetContext,
    account_id: &str,
) -> Result<Vec<DirectoryEntry>> {
    let Some(session) = ctx.session(account_id) else {
        return Ok(Vec::new());
    };
    let bridged = ctx.scope.bridged_guilds(account_id).await?;

    let mut guild_entries = Vec::new();
    for guild in session.client.guilds() {
        if !bridged.contains(&guild.id) {
            continue;
        }
        guild_entries.push(DirectoryEntry::category(&guild.name));
        for channel in &guild.channels {
            if let Channel::Text {
                id,
                name,
                parent_id: None,
                viewable: true,
                ..
            } = channel
            {
                guild_entries.push(DirectoryEntry::item(id, name));
            }
        }
        for category in &guild.channels {
            let Channel::Category {
                id: category_id,
                name: category_name,
                viewable: true,
                ..
            } = category
            else {
                continue;
            };
            guild_entries.push(DirectoryEntry::category(format!(
                "{} - {category_name}",
                guild.name
            )));
            for channel in &guild.channels {
                if let Channel::Text {
                    id,
                    name,
                    parent_id: Some(parent),
                    viewable: true,
                    ..
                } = channel
                    && parent == category_id
                {
                    guild_entries.push(DirectoryEntry::item(id, name));
                }
            }
        }
    }

    let mut entries: Vec<DirectoryEntry> = session
        .client
        .cached_channels()
        .into_iter()
        .filter_map(|channel| match channel {
            Channel::Group { id, name, .. } => {
                let name = name.unwrap_or_else(|| id.clone());
                Some(DirectoryEntry::item(id, name))
            },
            _ => None,
        })
        .collect();
    entries.extend(guild_entries);
    Ok(entries)
}
