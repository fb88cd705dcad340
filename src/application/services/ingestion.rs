use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::domain::{
    chunk_content,
    ports::{EmbeddingService, PageFetcher, VectorStore},
    DomainError,
};

pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Fetches a page, chunks it, embeds every chunk and commits the whole batch
/// to the vector index.
pub struct IngestionService {
    fetcher: Arc<dyn PageFetcher>,
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    chunk_size: usize,
}

impl IngestionService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            fetcher,
            embedding,
            vector_store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Returns the number of chunks added. Nothing is added unless every
    /// chunk was embedded.
    #[instrument(skip(self))]
    pub async fn ingest(&self, url: &str) -> Result<usize, DomainError> {
        let text = self.fetcher.fetch_text(url).await?;

        let chunks = chunk_content(url, &text, self.chunk_size);
        if chunks.is_empty() {
            return Err(DomainError::validation("page contains no text"));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(DomainError::external(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dimension = self.embedding.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.dimension() != dimension) {
            return Err(DomainError::external(format!(
                "expected {dimension}-dimensional embeddings, got {}",
                bad.dimension()
            )));
        }

        let count = chunks.len();
        let entries: Vec<_> = chunks.into_iter().zip(embeddings).collect();
        self.vector_store.add_batch(&entries).await?;

        info!(chunks = count, "page ingested");
        Ok(count)
    }

    /// [`ingest`](Self::ingest) reduced to a success flag; the failure is
    /// only logged.
    pub async fn load_and_store(&self, url: &str) -> bool {
        match self.ingest(url).await {
            Ok(_) => true,
            Err(e) => {
                error!(url, error = %e, "could not load data");
                false
            }
        }
    }
}
