use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::migrations::run_migrations;
use crate::models::{Document, DocumentChunk, IndexManifest, SearchResult};

/// File holding the index inside its persist directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite3";

/// On-disk vector index: chunk text and embeddings in SQLite, ranked by
/// brute-force cosine similarity at query time.
pub struct VectorStore {
    pool: SqlitePool,
    manifest: IndexManifest,
    persist_dir: PathBuf,
}

impl VectorStore {
    /// Creates a new, empty index in `persist_dir`.
    pub async fn create(persist_dir: &Path, manifest: IndexManifest) -> Result<Self> {
        tokio::fs::create_dir_all(persist_dir)
            .await
            .with_context(|| format!("Failed to create index directory {}", persist_dir.display()))?;

        let pool = connect(persist_dir, true).await?;
        run_migrations(&pool)
            .await
            .context("Failed to run index migrations")?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_meta")
            .fetch_one(&pool)
            .await
            .context("Failed to read index metadata")?;
        if existing > 0 {
            anyhow::bail!("An index already exists at {}", persist_dir.display());
        }

        write_manifest(&pool, &manifest).await?;

        tracing::info!(
            path = %persist_dir.display(),
            model = %manifest.embedding_model,
            dimension = manifest.dimension,
            "created vector index"
        );

        Ok(Self {
            pool,
            manifest,
            persist_dir: persist_dir.to_path_buf(),
        })
    }

    /// Opens an index previously written by [`VectorStore::create`].
    pub async fn open(persist_dir: &Path) -> Result<Self> {
        let db_path = persist_dir.join(INDEX_FILE_NAME);
        if !db_path.exists() {
            anyhow::bail!("Vector index file not found: {}", db_path.display());
        }

        let pool = connect(persist_dir, false).await?;
        run_migrations(&pool)
            .await
            .context("Failed to run index migrations")?;
        let manifest = read_manifest(&pool).await?;

        tracing::info!(path = %persist_dir.display(), "vector index loaded");

        Ok(Self {
            pool,
            manifest,
            persist_dir: persist_dir.to_path_buf(),
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Inserts all chunks in a single transaction.
    pub async fn insert_documents(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start insert transaction")?;

        for chunk in chunks {
            self.check_dimension(chunk.embedding.len(), "Embedding")?;

            sqlx::query(
                r#"
                INSERT INTO chunks (file_name, page, chunk_id, content, embedding)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.file_name)
            .bind(chunk.page as i64)
            .bind(chunk.chunk_id as i64)
            .bind(&chunk.content)
            .bind(encode_embedding(&chunk.embedding))
            .execute(&mut *tx)
            .await
            .context("Failed to insert document")?;
        }

        tx.commit()
            .await
            .context("Failed to commit inserted documents")?;
        Ok(())
    }

    pub async fn search_similar(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimension(query_embedding.len(), "Query embedding")?;

        let rows = sqlx::query(
            "SELECT id, file_name, page, chunk_id, content, embedding FROM chunks",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to execute similarity search")?;

        let mut results = rows
            .iter()
            .map(|row| -> Result<SearchResult> {
                let embedding = decode_embedding(&row.get::<Vec<u8>, _>("embedding"))?;
                let document = Document {
                    id: row.get("id"),
                    file_name: row.get("file_name"),
                    page: row.get::<i64, _>("page") as usize,
                    chunk_id: row.get::<i64, _>("chunk_id") as usize,
                    content: row.get("content"),
                    embedding,
                };
                let similarity = cosine_similarity(query_embedding, &document.embedding);
                Ok(SearchResult::new(document, similarity))
            })
            .collect::<Result<Vec<_>>>()?;

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(limit);

        for result in &results {
            tracing::debug!(
                file = %result.document.file_name,
                page = result.document.page,
                similarity = result.similarity,
                "retrieved chunk"
            );
        }
        tracing::info!(count = results.len(), "similarity search complete");

        Ok(results)
    }

    pub async fn get_document_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM chunks")
            .fetch_one(&self.pool)
            .await
            .context("Failed to get document count")?;

        Ok(row.get("count"))
    }

    /// Closes the underlying pool so the index files can be moved.
    pub async fn close(self) {
        self.pool.close().await;
    }

    fn check_dimension(&self, actual: usize, what: &str) -> Result<()> {
        if actual != self.manifest.dimension {
            anyhow::bail!(
                "{} dimension mismatch: expected {}, got {}",
                what,
                self.manifest.dimension,
                actual
            );
        }
        Ok(())
    }
}

async fn connect(persist_dir: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(persist_dir.join(INDEX_FILE_NAME))
        .create_if_missing(create);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open vector index at {}", persist_dir.display()))
}

async fn write_manifest(pool: &SqlitePool, manifest: &IndexManifest) -> Result<()> {
    let entries = [
        ("embedding_model", manifest.embedding_model.clone()),
        ("dimension", manifest.dimension.to_string()),
        ("created_at", manifest.created_at.to_rfc3339()),
    ];

    for (key, value) in entries {
        sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await
            .context("Failed to write index metadata")?;
    }

    Ok(())
}

async fn read_manifest(pool: &SqlitePool) -> Result<IndexManifest> {
    let rows = sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(pool)
        .await
        .context("Failed to read index metadata")?;

    let lookup = |key: &str| -> Result<String> {
        rows.iter()
            .find(|row| row.get::<String, _>("key") == key)
            .map(|row| row.get::<String, _>("value"))
            .ok_or_else(|| anyhow::anyhow!("Index metadata is missing '{key}'"))
    };

    let dimension = lookup("dimension")?
        .parse::<usize>()
        .context("Index metadata has an invalid dimension")?;
    let created_at = DateTime::parse_from_rfc3339(&lookup("created_at")?)
        .context("Index metadata has an invalid timestamp")?
        .with_timezone(&Utc);

    Ok(IndexManifest {
        embedding_model: lookup("embedding_model")?,
        dimension,
        created_at,
    })
}

pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|value| value.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        anyhow::bail!("Corrupt embedding: {} bytes is not a multiple of 4", bytes.len());
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
