use std::sync::Arc;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noderunner_bot::application::{ConversationController, IngestionService, RagService};
use noderunner_bot::domain::ports::{StateStore, VectorStore};
use noderunner_bot::infrastructure::{
    create_pool, telegram, AppConfig, Config, LocalVectorStore, OpenAiLlm, QdrantVectorStore,
    RedisStateStore, SqliteStateStore, TelegramTransport, TesseractOcr, TextEmbedding,
    WebPageFetcher,
};

async fn vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let storage = &config.storage;
    Ok(match &storage.qdrant_url {
        Some(url) => {
            info!(%url, collection = %storage.qdrant_collection, "using qdrant index");
            Arc::new(
                QdrantVectorStore::new(url, &storage.qdrant_collection, config.embedding.dimension)
                    .await?,
            )
        }
        None => {
            let dir = storage.index_dir();
            info!(path = %dir.display(), "using local index");
            Arc::new(LocalVectorStore::open(&dir).await?)
        }
    })
}

async fn state_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    let storage = &config.storage;
    Ok(match &storage.redis_url {
        Some(url) => {
            info!("using redis chat state");
            Arc::new(RedisStateStore::new(create_pool(url)?))
        }
        None => {
            let path = storage.state_db();
            info!(path = %path.display(), "using sqlite chat state");
            Arc::new(SqliteStateStore::open(&path).await?)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bot=debug,noderunner_bot=debug,teloxide=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let AppConfig { config, prompts } = AppConfig::load()?;
    let images_dir = config.storage.images_dir();
    tokio::fs::create_dir_all(&images_dir).await?;

    let embedding = Arc::new(TextEmbedding::from_config(&config.embedding));
    let vectors = vector_store(&config).await?;
    let states = state_store(&config).await?;
    info!(chunks = vectors.count().await?, "index ready");

    let ingestion = Arc::new(
        IngestionService::new(
            Arc::new(WebPageFetcher::new(&config.ingestion.user_agent)?),
            embedding.clone(),
            vectors.clone(),
        )
        .with_chunk_size(config.ingestion.chunk_size),
    );
    let rag = Arc::new(
        RagService::new(embedding, vectors, Arc::new(OpenAiLlm::new(&config.llm.model)))
            .with_system_prompt(prompts.system)
            .with_no_results_message(prompts.no_results),
    );

    let bot = Bot::new(&config.telegram.token);
    let controller = Arc::new(
        ConversationController::new(
            states,
            Arc::new(TelegramTransport::new(bot.clone())),
            ingestion,
            rag,
            Arc::new(TesseractOcr::new(
                config.ocr.binary.clone(),
                config.ocr.languages.clone(),
            )),
            config.access.policy(),
        )
        .with_texts(prompts.texts),
    );

    info!(admins = config.access.admin_user_ids.len(), "starting bot");
    telegram::run(bot, controller, images_dir).await;

    Ok(())
}
