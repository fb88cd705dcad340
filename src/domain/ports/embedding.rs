use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Text to fixed-length vector. Every vector has `dimension()` entries.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    /// One embedding per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;
    fn dimension(&self) -> usize;
}
