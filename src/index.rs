//! Persisted vector index.
//!
//! Stores `(vector, chunk, id)` triples in a single SQLite file and answers
//! nearest-neighbor queries by cosine similarity computed in Rust over all
//! rows. The `index_meta` table records which embedding model and
//! dimensionality produced the vectors; [`VectorIndex::open`] refuses to
//! reuse an index built under a different one, because mixing embedding
//! spaces degrades relevance silently.
//!
//! Building is the only expensive, mutating operation; queries are
//! read-only. On startup callers should prefer [`VectorIndex::open`] and
//! fall back to [`VectorIndex::build`] only when nothing is persisted yet.
//! There is no build lock: two processes rebuilding the same index path
//! concurrently is an operator error, not a supported mode.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::error::RagError;
use crate::models::{Chunk, ContentCategory, FileType, ScoredChunk};

#[derive(Debug)]
pub struct VectorIndex {
    pool: SqlitePool,
    dims: usize,
}

impl VectorIndex {
    /// Whether a persisted index exists at `path`.
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Embed every chunk and persist the index at `path`, replacing any
    /// previous contents.
    pub async fn build(
        path: &Path,
        embedder: &dyn Embedder,
        chunks: &[Chunk],
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let pool = connect(path, true).await?;
        create_schema(&pool).await?;

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await?;

        for (key, value) in [
            ("embedding_model", embedder.model_name().to_string()),
            ("dims", embedder.dims().to_string()),
        ] {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            for (chunk, vector) in batch.iter().zip(vectors.iter()) {
                if vector.len() != embedder.dims() {
                    return Err(RagError::Embedding(format!(
                        "provider returned {} dims, expected {}",
                        vector.len(),
                        embedder.dims()
                    )));
                }
                sqlx::query(
                    r#"
                    INSERT INTO chunks
                        (id, source_path, chunk_index, start_offset, category, file_type, text, embedding)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&chunk.id)
                .bind(&chunk.source_path)
                .bind(chunk.chunk_index)
                .bind(chunk.start_offset as i64)
                .bind(chunk.category.as_str())
                .bind(chunk.file_type.as_str())
                .bind(&chunk.text)
                .bind(vec_to_blob(vector))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::info!(chunks = chunks.len(), path = %path.display(), "built vector index");

        Ok(Self {
            pool,
            dims: embedder.dims(),
        })
    }

    /// Open a persisted index without re-embedding.
    ///
    /// Fails with [`RagError::IndexCorrupt`] if nothing is persisted at
    /// `path`, the file is unreadable, or the recorded embedding model or
    /// dimensionality differs from `embedder`'s. Recovery from a mismatch
    /// is an explicit rebuild, never attempted here.
    pub async fn open(path: &Path, embedder: &dyn Embedder) -> Result<Self, RagError> {
        if !Self::exists(path) {
            return Err(RagError::IndexCorrupt(format!(
                "no persisted index at {}",
                path.display()
            )));
        }

        let pool = connect(path, false)
            .await
            .map_err(|e| RagError::IndexCorrupt(format!("cannot open index: {e}")))?;

        let model = read_meta(&pool, "embedding_model").await?;
        let dims: usize = read_meta(&pool, "dims")
            .await?
            .parse()
            .map_err(|_| RagError::IndexCorrupt("index metadata 'dims' is not a number".into()))?;

        if model != embedder.model_name() {
            return Err(RagError::IndexCorrupt(format!(
                "index was built with embedding model '{}' but '{}' is configured; \
                 rebuild with `sage index --rebuild`",
                model,
                embedder.model_name()
            )));
        }
        if dims != embedder.dims() {
            return Err(RagError::IndexCorrupt(format!(
                "index dimensionality {} does not match provider dimensionality {}; \
                 rebuild with `sage index --rebuild`",
                dims,
                embedder.dims()
            )));
        }

        tracing::debug!(path = %path.display(), model, dims, "opened vector index");
        Ok(Self { pool, dims })
    }

    /// Return up to `k` records nearest to `vector` by cosine similarity,
    /// descending. Ties keep insertion order (first-seen wins). Returns
    /// fewer than `k` records if the index holds fewer; empty if it is
    /// empty.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let rows = sqlx::query(
            r#"
            SELECT id, source_path, chunk_index, start_offset, category, file_type, text, embedding
            FROM chunks
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let score = cosine_similarity(vector, &blob_to_vec(&blob));
            scored.push(ScoredChunk {
                chunk: chunk_from_row(row)?,
                score,
            });
        }

        // sort_by is stable, so equal scores preserve row (insertion) order
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Best-effort record count; `None` if the store cannot answer.
    pub async fn count(&self) -> Option<u64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .ok()
            .map(|n| n as u64)
    }

    /// Vector dimensionality this index was built with.
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn read_meta(pool: &SqlitePool, key: &str) -> Result<String, RagError> {
    sqlx::query_scalar::<_, String>("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| RagError::IndexCorrupt(format!("cannot read index metadata: {e}")))?
        .ok_or_else(|| RagError::IndexCorrupt(format!("index metadata missing '{key}'")))
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool, RagError> {
    if create {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RagError::IndexCorrupt(format!(
                    "cannot create index directory {}: {e}",
                    parent.display()
                )))?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<(), RagError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_path TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            start_offset INTEGER NOT NULL,
            category TEXT NOT NULL,
            file_type TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(source_path, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source_path ON chunks(source_path)")
        .execute(pool)
        .await?;

    Ok(())
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, RagError> {
    let category: String = row.get("category");
    let file_type: String = row.get("file_type");
    let start_offset: i64 = row.get("start_offset");

    Ok(Chunk {
        id: row.get("id"),
        source_path: row.get("source_path"),
        chunk_index: row.get("chunk_index"),
        start_offset: start_offset as usize,
        category: ContentCategory::parse(&category)
            .ok_or_else(|| RagError::IndexCorrupt(format!("unknown content category '{category}'")))?,
        file_type: FileType::parse(&file_type)
            .ok_or_else(|| RagError::IndexCorrupt(format!("unknown file type '{file_type}'")))?,
        text: row.get("text"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn chunk(path: &str, index: i64, text: &str) -> Chunk {
        Chunk {
            id: Uuid::new_v4().to_string(),
            source_path: path.to_string(),
            chunk_index: index,
            start_offset: 0,
            file_type: FileType::Markdown,
            category: ContentCategory::Documentation,
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk(
                "docs/blueprints.md",
                0,
                "A blueprint is declared with a module containing a struct and an impl block.",
            ),
            chunk(
                "docs/tokens.md",
                0,
                "Create a fungible token resource with ResourceBuilder.",
            ),
            chunk(
                "docs/badges.md",
                0,
                "Badges control access to protected component methods.",
            ),
        ]
    }

    #[tokio::test]
    async fn build_then_query_ranks_relevant_chunk_first() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(256);

        let index = VectorIndex::build(&path, &embedder, &corpus(), 64)
            .await
            .unwrap();

        let query = crate::embedding::embed_query(&embedder, "How do I declare a blueprint?")
            .await
            .unwrap();
        let results = index.query(&query, 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.source_path, "docs/blueprints.md");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn open_reproduces_build_results() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(128);

        let built = VectorIndex::build(&path, &embedder, &corpus(), 64)
            .await
            .unwrap();
        let query = crate::embedding::embed_query(&embedder, "token resource")
            .await
            .unwrap();
        let fresh: Vec<String> = built
            .query(&query, 3)
            .await
            .unwrap()
            .iter()
            .map(|r| r.chunk.id.clone())
            .collect();
        built.close().await;

        let reopened = VectorIndex::open(&path, &embedder).await.unwrap();
        let loaded: Vec<String> = reopened
            .query(&query, 3)
            .await
            .unwrap()
            .iter()
            .map(|r| r.chunk.id.clone())
            .collect();

        assert_eq!(fresh, loaded);
    }

    #[tokio::test]
    async fn query_depth_is_a_prefix_of_deeper_queries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(128);
        let index = VectorIndex::build(&path, &embedder, &corpus(), 64)
            .await
            .unwrap();

        let query = crate::embedding::embed_query(&embedder, "access badges")
            .await
            .unwrap();
        let shallow = index.query(&query, 1).await.unwrap();
        let deep = index.query(&query, 3).await.unwrap();

        assert_eq!(shallow.len(), 1);
        assert_eq!(shallow[0].chunk.id, deep[0].chunk.id);
    }

    #[tokio::test]
    async fn returns_fewer_than_k_when_small() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(64);
        let index = VectorIndex::build(&path, &embedder, &corpus(), 64)
            .await
            .unwrap();

        let query = crate::embedding::embed_query(&embedder, "anything").await.unwrap();
        let results = index.query(&query, 10).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn empty_index_queries_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(64);
        let index = VectorIndex::build(&path, &embedder, &[], 64).await.unwrap();

        assert_eq!(index.count().await, Some(0));
        let query = crate::embedding::embed_query(&embedder, "anything").await.unwrap();
        assert!(index.query(&query, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_missing_index_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.sqlite");
        let embedder = HashEmbedder::new(64);
        let err = VectorIndex::open(&path, &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::IndexCorrupt(_)));
    }

    #[tokio::test]
    async fn open_rejects_dimension_mismatch() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let built_with = HashEmbedder::new(128);
        VectorIndex::build(&path, &built_with, &corpus(), 64)
            .await
            .unwrap()
            .close()
            .await;

        let other = HashEmbedder::new(256);
        let err = VectorIndex::open(&path, &other).await.unwrap_err();
        match err {
            RagError::IndexCorrupt(msg) => assert!(msg.contains("rebuild"), "got: {msg}"),
            other => panic!("expected IndexCorrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rebuild_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let embedder = HashEmbedder::new(64);

        VectorIndex::build(&path, &embedder, &corpus(), 64)
            .await
            .unwrap()
            .close()
            .await;

        let smaller = vec![chunk("docs/only.md", 0, "just one chunk")];
        let index = VectorIndex::build(&path, &embedder, &smaller, 64)
            .await
            .unwrap();
        assert_eq!(index.count().await, Some(1));
    }
}
