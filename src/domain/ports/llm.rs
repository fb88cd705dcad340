use crate::domain::{errors::DomainError, Message};
use async_trait::async_trait;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Sends an ordered, role-tagged exchange and returns the model's single reply.
    async fn chat(&self, messages: &[Message]) -> Result<String, DomainError>;
}
