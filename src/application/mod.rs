//! Application layer - the bot's workflows.
//!
//! Services here orchestrate domain logic through domain ports (traits) and
//! never name a concrete adapter: ingestion of documentation pages,
//! retrieval-augmented answering, and the per-chat conversation controller.

pub mod services;

pub use services::{
    compose_query, extract_text_from_image, format_response, AccessPolicy, BotTexts,
    ConversationController, IngestionService, RagService,
};
