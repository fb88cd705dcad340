use crate::domain::{errors::DomainError, PromptRef, Reply};
use async_trait::async_trait;

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, chat_id: i64, reply: Reply) -> Result<(), DomainError>;
    /// Replaces the text and keyboard of a message the bot sent earlier.
    async fn edit(&self, chat_id: i64, prompt: PromptRef, reply: Reply) -> Result<(), DomainError>;
    async fn delete(&self, chat_id: i64, prompt: PromptRef) -> Result<(), DomainError>;
    async fn typing(&self, chat_id: i64) -> Result<(), DomainError>;
}
