use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use marionette_channels::DEFAULT_SEND_LOCK_TIMEOUT;

/// Phrase an admin must type to enable friends management.
pub const FRIENDS_MANAGEMENT_CONFIRMATION: &str = "YES I KNOW THE RISKS";

/// Configuration and metadata of a single puppet account.
///
/// This is the per-account data the bridge persists: credentials plus the
/// identity learned at login.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordAccountConfig {
    /// Bot or user token.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Allow managing the account's friends list (user accounts only).
    pub friends_management: bool,

    /// `username#discriminator` of the account, filled in at login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Remote user id of the account, filled in at login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl std::fmt::Debug for DiscordAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordAccountConfig")
            .field("token", &"[REDACTED]")
            .field("friends_management", &self.friends_management)
            .field("username", &self.username)
            .field("id", &self.id)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for DiscordAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            friends_management: false,
            username: None,
            id: None,
        }
    }
}

/// Process-wide tunables shared by every account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscordBridgeConfig {
    /// Seconds after which a held send lock is force-released.
    pub send_lock_timeout_secs: u64,

    /// Largest file (bytes) uploaded natively; bigger files become links.
    pub max_file_size: u64,

    /// Character budget of a single admin command reply.
    pub max_command_message_len: usize,
}

impl Default for DiscordBridgeConfig {
    fn default() -> Self {
        Self {
            send_lock_timeout_secs: DEFAULT_SEND_LOCK_TIMEOUT.as_secs(),
            max_file_size: 8_000_000,
            max_command_message_len: 4000,
        }
    }
}

impl DiscordBridgeConfig {
    pub fn send_lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.send_lock_timeout_secs)
    }
}
