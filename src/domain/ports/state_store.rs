use crate::domain::{errors::DomainError, ChatState};
use async_trait::async_trait;

/// Durable chat id -> [`ChatState`] mapping. A missing record means `Idle`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, chat_id: i64) -> Result<Option<ChatState>, DomainError>;
    async fn save(&self, chat_id: i64, state: ChatState) -> Result<(), DomainError>;
    async fn clear(&self, chat_id: i64) -> Result<(), DomainError>;
}
