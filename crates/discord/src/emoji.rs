use tracing::{debug, warn};

use marionette_channels::StoredEmoji;

use crate::context::PuppetContext;

const EMOJI_CDN: &str = "https://cdn.discordapp.com/emojis";

pub fn emoji_url(emoji_id: &str, animated: bool) -> String {
    let ext = if animated { "gif" } else { "png" };
    format!("{EMOJI_CDN}/{emoji_id}.{ext}")
}

/// Bridge content URI of a custom emoji, uploading it on first use.
///
/// Failures are logged and yield `None`, leaving the emoji as text.
pub async fn resolve_emoji(
    ctx: &PuppetContext,
    name: &str,
    animated: bool,
    emoji_id: &str,
) -> Option<String> {
    match ctx.emoji.get_emoji(emoji_id).await {
        Ok(Some(cached)) => return Some(cached.local_uri),
        Ok(None) => {},
        Err(e) => warn!(emoji_id, error = %e, "emoji cache lookup failed"),
    }

    let url = emoji_url(emoji_id, animated);
    let data = match ctx.media.fetch(&url).await {
        Ok(data) => data,
        Err(e) => {
            warn!(emoji_id, error = %e, "failed to download emoji");
            return None;
        },
    };
    let mime = if animated { "image/gif" } else { "image/png" };
    let local_uri = match ctx.bridge.upload_media(data, mime).await {
        Ok(uri) => uri,
        Err(e) => {
            warn!(emoji_id, error = %e, "failed to upload emoji");
            return None;
        },
    };
    debug!(emoji_id, name, "cached custom emoji");

    let stored = StoredEmoji {
        emoji_id: emoji_id.to_string(),
        name: name.to_string(),
        animated,
        local_uri: local_uri.clone(),
    };
    if let Err(e) = ctx.emoji.set_emoji(stored).await {
        warn!(emoji_id, error = %e, "failed to store emoji");
    }
    Some(local_uri)
}
