mod controller;
mod format;
mod image_text;
mod ingestion;
mod rag;

pub use controller::{AccessPolicy, BotTexts, ConversationController};
pub use format::{format_response, RESERVED_CHARS};
pub use image_text::extract_text_from_image;
pub use ingestion::{IngestionService, DEFAULT_CHUNK_SIZE};
pub use rag::{compose_query, RagService, DEFAULT_NO_RESULTS_MESSAGE, DEFAULT_SYSTEM_PROMPT};
