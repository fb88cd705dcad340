use async_trait::async_trait;
use std::collections::HashMap;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;
use tracing::instrument;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// OpenAI embeddings. Reads `OPENAI_API_KEY` when constructed.
pub struct TextEmbedding {
    client: openai::Client,
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self {
            client: openai::Client::from_env(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new()
            .with_model(&config.model)
            .with_dimension(config.dimension)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

impl Default for TextEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self
            .client
            .embedding_model_with_ndims(&self.model, self.dimension);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(text.to_string())
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let by_document = embeddings
            .into_iter()
            .map(|(document, emb)| (document, emb.first().vec));
        in_input_order(texts, by_document)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// The builder yields `(document, vector)` pairs in no particular order;
/// lines them back up with the request. Identical inputs share a vector.
fn in_input_order(
    texts: &[&str],
    results: impl IntoIterator<Item = (String, Vec<f64>)>,
) -> Result<Vec<Embedding>, DomainError> {
    let by_document: HashMap<String, Vec<f64>> = results.into_iter().collect();
    texts
        .iter()
        .map(|text| {
            by_document
                .get(*text)
                .map(|vec| Embedding::new(vec.iter().map(|&x| x as f32).collect()))
                .ok_or_else(|| DomainError::external("embedding response is missing an input"))
        })
        .collect()
}
