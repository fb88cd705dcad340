mod embedding;
mod llm;
mod ocr;
mod page_fetcher;
mod state_store;
mod transport;
mod vector_store;

pub use embedding::EmbeddingService;
pub use llm::LlmService;
pub use ocr::OcrEngine;
pub use page_fetcher::PageFetcher;
pub use state_store::StateStore;
pub use transport::ChatTransport;
pub use vector_store::VectorStore;
