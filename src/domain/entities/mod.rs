mod chat_state;
mod conversation;
mod document;
mod embedding;
mod event;

pub use chat_state::ChatState;
pub use conversation::{Message, MessageRole};
pub use document::{chunk_content, DocumentChunk, SearchResult};
pub use embedding::Embedding;
pub use event::{
    Button, ButtonAction, EventKind, InboundEvent, PromptRef, Reply, TextFormat,
};
