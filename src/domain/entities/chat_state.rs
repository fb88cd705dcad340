use serde::{Deserialize, Serialize};

/// Pending operation of a single chat.
///
/// Only non-idle states are ever persisted; a chat with no stored record is
/// `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChatState {
    #[default]
    Idle,
    AwaitingUrl,
    AwaitingSubscriptionConfirmation,
}

impl ChatState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
