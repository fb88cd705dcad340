use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use tracing::warn;

use crate::domain::{ports::StateStore, ChatState, DomainError};

pub type RedisPool = Pool;

pub fn create_pool(redis_url: &str) -> Result<RedisPool, DomainError> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| DomainError::storage(format!("Redis pool error: {e}")))
}

fn state_key(chat_id: i64) -> String {
    format!("chat:state:{chat_id}")
}

/// Redis-backed [`StateStore`], one string key per chat.
pub struct RedisStateStore {
    pool: RedisPool,
}

impl RedisStateStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Connection, DomainError> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::storage(format!("Redis pool error: {e}")))
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn load(&self, chat_id: i64) -> Result<Option<ChatState>, DomainError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(state_key(chat_id))
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        Ok(raw.and_then(|raw| match ChatState::from_json(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(chat_id, raw = %raw, error = %e, "unreadable chat state, treating as idle");
                None
            }
        }))
    }

    async fn save(&self, chat_id: i64, state: ChatState) -> Result<(), DomainError> {
        if state.is_idle() {
            return self.clear(chat_id).await;
        }

        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(state_key(chat_id), state.to_json()?)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))
    }

    async fn clear(&self, chat_id: i64) -> Result<(), DomainError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(state_key(chat_id))
            .await
            .map_err(|e| DomainError::storage(e.to_string()))
    }
}
