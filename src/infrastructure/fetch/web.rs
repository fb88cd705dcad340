use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use crate::domain::{ports::PageFetcher, DomainError};

/// Line width used when rendering HTML; wide enough that paragraphs stay on
/// one line.
const TEXT_WIDTH: usize = 400;

/// Converts an HTML document to plain text, paragraphs separated by blank lines.
pub fn html_to_text(html: &str) -> Result<String, DomainError> {
    html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .map_err(|e| DomainError::external(format!("Failed to convert HTML to text: {e}")))
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    match content_type {
        Some(ct) if ct.contains("html") => true,
        Some(ct) if ct.starts_with("text/") => false,
        _ => body.trim_start().starts_with('<'),
    }
}

/// Plain HTTP GET, no authentication; redirects follow reqwest's defaults.
pub struct WebPageFetcher {
    client: reqwest::Client,
}

impl WebPageFetcher {
    pub fn new(user_agent: &str) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| DomainError::internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for WebPageFetcher {
    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::external(format!("Failed to fetch URL: {e}")))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let body = response
            .text()
            .await
            .map_err(|e| DomainError::external(format!("Failed to read response: {e}")))?;
        debug!(bytes = body.len(), content_type = ?content_type, "page fetched");

        if looks_like_html(content_type.as_deref(), &body) {
            html_to_text(&body)
        } else {
            Ok(body)
        }
    }
}
