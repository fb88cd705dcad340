use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{
    ports::{EmbeddingService, LlmService, VectorStore},
    DomainError, Message, SearchResult,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = "Вы являетесь техническим помощником по установке узлов.";
pub const DEFAULT_NO_RESULTS_MESSAGE: &str = "No relevant information found.";

/// Joins the message text and OCR text into the query used for retrieval.
pub fn compose_query(text: &str, image_text: &str) -> String {
    format!("{text}\n{image_text}").trim().to_string()
}

/// Retrieval plus answer generation over the vector index.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    no_results_message: String,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmService>,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            llm,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            no_results_message: DEFAULT_NO_RESULTS_MESSAGE.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_no_results_message(mut self, message: impl Into<String>) -> Self {
        self.no_results_message = message.into();
        self
    }

    /// Nearest chunk to `query`, with no relevance threshold.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Option<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        let mut results = self.vector_store.search(&embedding, 1).await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.swap_remove(0))
        })
    }

    /// System instruction, then the user's text, then the retrieved chunk as
    /// assistant context.
    pub fn build_exchange(&self, query: &str, context: &str) -> Vec<Message> {
        vec![
            Message::system(&self.system_prompt),
            Message::user(query),
            Message::assistant(context),
        ]
    }

    /// Answers `text` (plus any text read from an attached image). Returns the
    /// fixed no-results message, without calling the model, when nothing is
    /// retrieved. An empty query gets the same reply before retrieval, since
    /// the embeddings API rejects empty input.
    #[instrument(skip(self, text, image_text), fields(text_len = text.len(), image_text_len = image_text.len()))]
    pub async fn answer(&self, text: &str, image_text: &str) -> Result<String, DomainError> {
        let query = compose_query(text, image_text);
        if query.is_empty() {
            debug!("empty query");
            return Ok(self.no_results_message.clone());
        }

        let Some(hit) = self.retrieve(&query).await? else {
            debug!("index returned no chunk");
            return Ok(self.no_results_message.clone());
        };
        debug!(source_url = %hit.chunk.source_url, score = hit.score, "context retrieved");

        let exchange = self.build_exchange(&query, &hit.chunk.content);
        self.llm.chat(&exchange).await
    }
}
