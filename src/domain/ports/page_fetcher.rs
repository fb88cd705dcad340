use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Downloads a page and returns its readable text.
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError>;
}
