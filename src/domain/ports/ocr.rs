use crate::domain::errors::DomainError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognized text blocks in reading order.
    async fn recognize(&self, image: &Path) -> Result<Vec<String>, DomainError>;
}
