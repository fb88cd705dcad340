use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends a batch of chunks. Either every entry becomes searchable or none does.
    async fn add_batch(&self, entries: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError>;
    async fn search(&self, query: &Embedding, top_k: usize)
        -> Result<Vec<SearchResult>, DomainError>;
    async fn count(&self) -> Result<usize, DomainError>;
}
