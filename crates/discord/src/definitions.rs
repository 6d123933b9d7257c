//! Metric names emitted when the `metrics` feature is enabled.

/// Remote events dispatched to the inbound handlers, labelled by `event`.
pub const EVENTS_RECEIVED_TOTAL: &str = "marionette_discord_events_received_total";
/// Inbound handler failures, labelled by `event`.
pub const EVENT_ERRORS_TOTAL: &str = "marionette_discord_event_errors_total";
/// Own messages recognised as echoes and dropped.
pub const ECHOES_SUPPRESSED_TOTAL: &str = "marionette_discord_echoes_suppressed_total";
/// Events dropped because the conversation is not bridged.
pub const SCOPE_DENIALS_TOTAL: &str = "marionette_discord_scope_denials_total";
/// Remote messages created by bridge intents.
pub const MESSAGES_SENT_TOTAL: &str = "marionette_discord_messages_sent_total";
/// Bridge intents that failed, labelled by `op`.
pub const SEND_ERRORS_TOTAL: &str = "marionette_discord_send_errors_total";
/// Sessions currently in the account table.
pub const ACTIVE_SESSIONS: &str = "marionette_discord_active_sessions";
