//! Fakes for the domain ports, shared by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::domain::{
    ports::{ChatTransport, EmbeddingService, LlmService, OcrEngine, PageFetcher, StateStore},
    ChatState, DomainError, Embedding, Message, PromptRef, Reply,
};

/// Letter-frequency vectors: texts sharing letters land close together.
pub struct FakeEmbedding;

impl FakeEmbedding {
    fn vectorize(text: &str) -> Embedding {
        let mut counts = vec![0.0f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Embedding::new(counts)
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        26
    }
}

pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingService for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
        Err(DomainError::external("embedding quota exceeded"))
    }

    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Err(DomainError::external("embedding quota exceeded"))
    }

    fn dimension(&self) -> usize {
        26
    }
}

pub struct FakeLlm {
    reply: String,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for FakeLlm {
    async fn chat(&self, messages: &[Message]) -> Result<String, DomainError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(url: &str, text: &str) -> Self {
        Self::default().page(url, text)
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| DomainError::external(format!("GET {url}: connection refused")))
    }
}

pub struct FakeOcr {
    blocks: Option<Vec<String>>,
}

impl FakeOcr {
    pub fn returning(blocks: &[&str]) -> Self {
        Self {
            blocks: Some(blocks.iter().map(|b| b.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { blocks: None }
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(&self, _image: &Path) -> Result<Vec<String>, DomainError> {
        self.blocks
            .clone()
            .ok_or_else(|| DomainError::validation("unsupported image format"))
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<i64, ChatState>>,
}

impl MemoryStateStore {
    pub fn get(&self, chat_id: i64) -> Option<ChatState> {
        self.states.lock().unwrap().get(&chat_id).copied()
    }

    pub fn put(&self, chat_id: i64, state: ChatState) {
        self.states.lock().unwrap().insert(chat_id, state);
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, chat_id: i64) -> Result<Option<ChatState>, DomainError> {
        Ok(self.get(chat_id))
    }

    async fn save(&self, chat_id: i64, state: ChatState) -> Result<(), DomainError> {
        self.put(chat_id, state);
        Ok(())
    }

    async fn clear(&self, chat_id: i64) -> Result<(), DomainError> {
        self.states.lock().unwrap().remove(&chat_id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message { chat_id: i64, reply: Reply },
    Edited { chat_id: i64, prompt: PromptRef, reply: Reply },
    Deleted { chat_id: i64, prompt: PromptRef },
    Typing { chat_id: i64 },
}

#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<Sent>>,
}

impl FakeTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// New messages sent to `chat_id`, oldest first.
    pub fn replies(&self, chat_id: i64) -> Vec<Reply> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { chat_id: c, reply } if c == chat_id => Some(reply),
                _ => None,
            })
            .collect()
    }

    pub fn last_reply(&self, chat_id: i64) -> Option<Reply> {
        self.replies(chat_id).pop()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, chat_id: i64, reply: Reply) -> Result<(), DomainError> {
        self.record(Sent::Message { chat_id, reply });
        Ok(())
    }

    async fn edit(&self, chat_id: i64, prompt: PromptRef, reply: Reply) -> Result<(), DomainError> {
        self.record(Sent::Edited {
            chat_id,
            prompt,
            reply,
        });
        Ok(())
    }

    async fn delete(&self, chat_id: i64, prompt: PromptRef) -> Result<(), DomainError> {
        self.record(Sent::Deleted { chat_id, prompt });
        Ok(())
    }

    async fn typing(&self, chat_id: i64) -> Result<(), DomainError> {
        self.record(Sent::Typing { chat_id });
        Ok(())
    }
}
