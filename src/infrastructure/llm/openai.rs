use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{Chat, Message as RigMessage};
use rig::providers::openai;
use tracing::instrument;

use crate::domain::{ports::LlmService, DomainError, Message, MessageRole};

/// OpenAI chat completion. System messages become the preamble; the last
/// remaining message is the prompt and everything before it the history.
pub struct OpenAiLlm {
    client: openai::Client,
    model: String,
}

impl OpenAiLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: openai::Client::from_env(),
            model: model.into(),
        }
    }
}

fn split_exchange(messages: &[Message]) -> (String, Vec<RigMessage>) {
    let preamble = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let turns = messages
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::System => None,
            MessageRole::User => Some(RigMessage::user(m.content.clone())),
            MessageRole::Assistant => Some(RigMessage::assistant(m.content.clone())),
        })
        .collect();

    (preamble, turns)
}

#[async_trait]
impl LlmService for OpenAiLlm {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn chat(&self, messages: &[Message]) -> Result<String, DomainError> {
        let (preamble, mut history) = split_exchange(messages);
        let prompt = history
            .pop()
            .ok_or_else(|| DomainError::validation("exchange has no user or assistant message"))?;

        let agent = self.client.agent(&self.model).preamble(&preamble).build();
        agent
            .chat(prompt, history)
            .await
            .map_err(|e| DomainError::external(e.to_string()))
    }
}
