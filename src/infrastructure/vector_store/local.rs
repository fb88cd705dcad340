use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

const INDEX_FILE: &str = "chunks.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    embedding: Embedding,
}

/// Brute-force cosine index kept in memory and persisted as one JSON line
/// per chunk under a directory.
///
/// A batch is appended with a single write followed by `fsync`, and only then
/// made searchable. A torn trailing line left by a crash is dropped on open.
pub struct LocalVectorStore {
    file: Option<PathBuf>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl LocalVectorStore {
    /// Non-persistent index.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::storage(format!("create {}: {e}", dir.display())))?;

        let file = dir.join(INDEX_FILE);
        let entries = match tokio::fs::read_to_string(&file).await {
            Ok(raw) => Self::load_entries(&file, &raw).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(DomainError::storage(format!("read {}: {e}", file.display())))
            }
        };
        info!(path = %file.display(), chunks = entries.len(), "vector index opened");

        Ok(Self {
            file: Some(file),
            entries: RwLock::new(entries),
        })
    }

    async fn load_entries(file: &Path, raw: &str) -> Result<Vec<IndexEntry>, DomainError> {
        let mut entries = Vec::new();
        let mut dropped = 0usize;
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<IndexEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(_) => dropped += 1,
            }
        }

        let torn_tail = !raw.is_empty() && !raw.ends_with('\n');
        if dropped > 0 || torn_tail {
            warn!(path = %file.display(), dropped, "rewriting damaged vector index");
            Self::rewrite(file, &entries).await?;
        }
        Ok(entries)
    }

    async fn rewrite(file: &Path, entries: &[IndexEntry]) -> Result<(), DomainError> {
        let tmp = file.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, encode(entries)?)
            .await
            .map_err(|e| DomainError::storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, file)
            .await
            .map_err(|e| DomainError::storage(format!("replace {}: {e}", file.display())))
    }

    /// Appends `buf` in one write plus `fsync`. On failure the file is cut
    /// back to its previous length so no part of the batch survives.
    async fn append(file: &Path, buf: &[u8]) -> Result<(), DomainError> {
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .await
            .map_err(|e| DomainError::storage(format!("open {}: {e}", file.display())))?;
        let committed = handle
            .metadata()
            .await
            .map_err(|e| DomainError::storage(format!("stat {}: {e}", file.display())))?
            .len();

        let written = async {
            handle.write_all(buf).await?;
            handle.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(handle);
            Self::truncate(file, committed).await;
            return Err(DomainError::storage(format!("append {}: {e}", file.display())));
        }
        Ok(())
    }

    async fn truncate(file: &Path, len: u64) {
        let result = async {
            let handle = tokio::fs::OpenOptions::new().write(true).open(file).await?;
            handle.set_len(len).await?;
            handle.sync_all().await
        }
        .await;
        if let Err(e) = result {
            error!(path = %file.display(), len, error = %e, "could not roll back vector index");
        }
    }
}

fn encode(entries: &[IndexEntry]) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add_batch(&self, batch: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write().await;

        let dimension = entries
            .first()
            .map(|e| e.embedding.dimension())
            .unwrap_or_else(|| batch[0].1.dimension());
        if let Some((chunk, _)) = batch.iter().find(|(_, e)| e.dimension() != dimension) {
            return Err(DomainError::validation(format!(
                "chunk {} has an embedding of a different dimension than the index ({dimension})",
                chunk.id
            )));
        }

        let new_entries: Vec<IndexEntry> = batch
            .iter()
            .map(|(chunk, embedding)| IndexEntry {
                chunk: chunk.clone(),
                embedding: embedding.clone(),
            })
            .collect();

        if let Some(file) = &self.file {
            Self::append(file, &encode(&new_entries)?).await?;
        }
        entries.extend(new_entries);
        Ok(())
    }

    async fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let entries = self.entries.read().await;

        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: query.cosine_similarity(&entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.read().await.len())
    }
}
