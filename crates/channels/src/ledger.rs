use std::{collections::VecDeque, sync::Mutex};

/// Remote message ids a session emitted itself and still expects to see
/// echoed back.
///
/// Each recorded id suppresses exactly one echo: [`SentLedger::consume`]
/// removes the entry, so a second delivery of the same id is treated as a
/// genuine remote event.
#[derive(Debug, Default)]
pub struct SentLedger {
    ids: Mutex<VecDeque<String>>,
}

impl SentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message_id: impl Into<String>) {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.push_back(message_id.into());
    }

    /// Remove one occurrence of `message_id`. Returns whether it was present.
    pub fn consume(&self, message_id: &str) -> bool {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        match ids.iter().position(|id| id == message_id) {
            Some(ix) => {
                ids.remove(ix);
                true
            },
            None => false,
        }
    }

    pub fn contains(&self, message_id: &str) -> bool {
        let ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.iter().any(|id| id == message_id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
