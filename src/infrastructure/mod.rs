pub mod config;
pub mod embedding;
pub mod fetch;
pub mod llm;
pub mod ocr;
pub mod state_store;
pub mod telegram;
pub mod vector_store;

pub use config::{AppConfig, Config, ConfigError, PromptsConfig};
pub use embedding::TextEmbedding;
pub use fetch::WebPageFetcher;
pub use llm::OpenAiLlm;
pub use ocr::TesseractOcr;
pub use state_store::{create_pool, RedisStateStore, SqliteStateStore};
pub use telegram::TelegramTransport;
pub use vector_store::{LocalVectorStore, QdrantVectorStore};
