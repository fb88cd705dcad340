//! SQLite-backed [`StateStore`]: one `states` table of
//! `(chat_id INTEGER PRIMARY KEY, state TEXT)` holding JSON-encoded
//! [`ChatState`] values.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::domain::{ports::StateStore, ChatState, DomainError};

pub struct SqliteStateStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::storage(e.to_string())
}

impl SqliteStateStore {
    /// Opens (creating if needed) the database file and its table.
    pub async fn open(path: &Path) -> Result<Self, DomainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainError::storage(format!("create {}: {e}", parent.display())))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(db_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DomainError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS states (chat_id INTEGER PRIMARY KEY, state TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(db_err)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self, chat_id: i64) -> Result<Option<ChatState>, DomainError> {
        let row = sqlx::query("SELECT state FROM states WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("state").map_err(db_err)?;
        match ChatState::from_json(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(chat_id, raw = %raw, error = %e, "unreadable chat state, treating as idle");
                Ok(None)
            }
        }
    }

    async fn save(&self, chat_id: i64, state: ChatState) -> Result<(), DomainError> {
        if state.is_idle() {
            return self.clear(chat_id).await;
        }

        sqlx::query("REPLACE INTO states (chat_id, state) VALUES (?, ?)")
            .bind(chat_id)
            .bind(state.to_json()?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn clear(&self, chat_id: i64) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM states WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStateStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStateStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let store = memory_store().await;
        assert_eq!(store.load(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_and_clear_deletes() {
        let store = memory_store().await;

        store.save(1, ChatState::AwaitingSubscriptionConfirmation).await.unwrap();
        store.save(1, ChatState::AwaitingUrl).await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), Some(ChatState::AwaitingUrl));

        store.clear(1).await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), None);
        store.clear(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_saving_idle_removes_record() {
        let store = memory_store().await;
        store.save(3, ChatState::AwaitingUrl).await.unwrap();
        store.save(3, ChatState::Idle).await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM states")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let store = memory_store().await;
        store.save(1, ChatState::AwaitingUrl).await.unwrap();
        store.save(2, ChatState::AwaitingSubscriptionConfirmation).await.unwrap();
        store.clear(1).await.unwrap();

        assert_eq!(store.load(1).await.unwrap(), None);
        assert_eq!(
            store.load(2).await.unwrap(),
            Some(ChatState::AwaitingSubscriptionConfirmation)
        );
    }

    #[tokio::test]
    async fn test_legacy_value_reads_as_idle() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO states (chat_id, state) VALUES (?, ?)")
            .bind(5_i64)
            .bind("1")
            .execute(&store.pool)
            .await
            .unwrap();

        assert_eq!(store.load(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.db");
        {
            let store = SqliteStateStore::open(&path).await.unwrap();
            store.save(-100, ChatState::AwaitingUrl).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteStateStore::open(&path).await.unwrap();
        assert_eq!(reopened.load(-100).await.unwrap(), Some(ChatState::AwaitingUrl));
    }
}
