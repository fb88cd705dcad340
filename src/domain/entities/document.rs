use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of text taken from one ingested page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub source_url: String,
    pub content: String,
    pub chunk_index: usize,
    pub ingested_at: DateTime<Utc>,
}

impl DocumentChunk {
    pub fn new(source_url: impl Into<String>, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            content: content.into(),
            chunk_index,
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Splits page text into chunks of at most `max_chars` characters, without overlap.
///
/// Paragraphs (separated by a blank line) are joined until the next one would
/// push the chunk past `max_chars`. A paragraph that is longer than the limit
/// on its own is cut at character boundaries. Each chunk is assigned a
/// sequential index starting from 0.
pub fn chunk_content(source_url: &str, content: &str, max_chars: usize) -> Vec<DocumentChunk> {
    let max_chars = max_chars.max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let paragraph_len = paragraph.chars().count();

        if current_len > 0 && current_len + 2 + paragraph_len > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if paragraph_len > max_chars {
            let chars: Vec<char> = paragraph.chars().collect();
            let mut parts = chars.chunks(max_chars).peekable();
            while let Some(part) = parts.next() {
                if parts.peek().is_some() {
                    pieces.push(part.iter().collect());
                } else {
                    current = part.iter().collect();
                    current_len = part.len();
                }
            }
            continue;
        }

        if current_len > 0 {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += paragraph_len;
    }

    if current_len > 0 {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| DocumentChunk::new(source_url, text, index))
        .collect()
}
