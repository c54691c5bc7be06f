use anyhow::{Context, Result};
use embeddings::{ChunkConfig, EmbeddingProvider, TextChunker};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::loader::load_pdf_directory;
use crate::models::{DocumentChunk, IndexManifest, SourcePage};
use crate::store::VectorStore;

/// The dataset directory is absent or holds no usable PDFs.
///
/// Raised inside `anyhow::Error`; callers recover it with `downcast_ref`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DatasetNotFound(pub String);

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub dataset_dir: PathBuf,
    pub persist_dir: PathBuf,
    pub chunk: ChunkConfig,
    pub batch_size: usize,
}

impl IndexSettings {
    pub fn new(dataset_dir: impl Into<PathBuf>, persist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            persist_dir: persist_dir.into(),
            chunk: ChunkConfig::default(),
            batch_size: 32,
        }
    }

    fn staging_dir(&self) -> PathBuf {
        let mut name = self
            .persist_dir
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "index".into());
        name.push(".building");
        self.persist_dir.with_file_name(name)
    }
}

/// Loads the persisted index, or builds it from the dataset's PDFs on first use.
pub struct IndexBuilder<'a> {
    settings: &'a IndexSettings,
    embedder: &'a dyn EmbeddingProvider,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(settings: &'a IndexSettings, embedder: &'a dyn EmbeddingProvider) -> Self {
        Self { settings, embedder }
    }

    pub async fn load_or_build(&self) -> Result<VectorStore> {
        if self.settings.persist_dir.exists() {
            return self.load().await;
        }

        tracing::warn!(
            path = %self.settings.persist_dir.display(),
            "vector index not found, building it"
        );
        self.build().await
    }

    /// Opens the existing index and checks it was built with the current embedder.
    pub async fn load(&self) -> Result<VectorStore> {
        let store = VectorStore::open(&self.settings.persist_dir)
            .await
            .context("Failed to load vector database")?;

        let manifest = store.manifest();
        if !manifest.is_compatible_with(self.embedder.model_id(), self.embedder.dimension()) {
            let message = format!(
                "Vector index at {} was built with {} ({} dims) but the configured embedder is {} ({} dims); delete the directory to rebuild it",
                self.settings.persist_dir.display(),
                manifest.embedding_model,
                manifest.dimension,
                self.embedder.model_id(),
                self.embedder.dimension()
            );
            store.close().await;
            anyhow::bail!(message);
        }

        Ok(store)
    }

    pub async fn build(&self) -> Result<VectorStore> {
        let dataset_dir = &self.settings.dataset_dir;
        ensure_dataset_dir(dataset_dir).await?;

        let pages = load_pdf_directory(dataset_dir).await?;
        if pages.is_empty() {
            tracing::error!(path = %dataset_dir.display(), "no PDF documents found");
            return Err(DatasetNotFound(format!(
                "No PDF documents found in {}",
                dataset_dir.display()
            ))
            .into());
        }

        self.build_from_pages(&pages)
            .await
            .context("Failed to create vector database")
    }

    /// Chunks, embeds and persists `pages`, then opens the finished index.
    ///
    /// The index is written to a sibling staging directory and renamed into
    /// place once complete.
    pub async fn build_from_pages(&self, pages: &[SourcePage]) -> Result<VectorStore> {
        self.settings.chunk.validate()?;

        let chunks = self.embed_pages(pages).await?;
        if chunks.is_empty() {
            return Err(DatasetNotFound(format!(
                "No PDF documents found in {}",
                self.settings.dataset_dir.display()
            ))
            .into());
        }

        let staging = self.settings.staging_dir();
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging)
                .await
                .with_context(|| format!("Failed to clear {}", staging.display()))?;
        }

        let manifest = IndexManifest::new(self.embedder.model_id(), self.embedder.dimension());
        let store = VectorStore::create(&staging, manifest).await?;
        let chunk_count = chunks.len();
        store.insert_documents(chunks).await?;
        store.close().await;

        if let Some(parent) = self.settings.persist_dir.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::rename(&staging, &self.settings.persist_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to move index into {}",
                    self.settings.persist_dir.display()
                )
            })?;

        tracing::info!(
            chunks = chunk_count,
            path = %self.settings.persist_dir.display(),
            "vector database created and data saved"
        );

        VectorStore::open(&self.settings.persist_dir).await
    }

    async fn embed_pages(&self, pages: &[SourcePage]) -> Result<Vec<DocumentChunk>> {
        let chunker = TextChunker::new(self.settings.chunk.clone());

        let pending: Vec<(&SourcePage, usize, String)> = pages
            .iter()
            .flat_map(|page| {
                chunker
                    .chunk_text(&page.text)
                    .into_iter()
                    .map(move |chunk| (page, chunk.chunk_id, chunk.content))
            })
            .collect();

        let mut chunks = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.settings.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(_, _, text)| text.clone()).collect();
            let embeddings = self
                .embedder
                .embed(texts)
                .await
                .context("Failed to generate embeddings")?;

            if embeddings.len() != batch.len() {
                anyhow::bail!(
                    "Embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                );
            }

            for ((page, chunk_id, content), embedding) in batch.iter().zip(embeddings) {
                chunks.push(DocumentChunk::new(
                    page.file_name.clone(),
                    page.page,
                    *chunk_id,
                    content.clone(),
                    embedding,
                ));
            }
        }

        Ok(chunks)
    }
}

/// Creates the dataset directory when missing. A freshly created directory
/// cannot hold any PDFs yet, so that case is reported as `DatasetNotFound`.
async fn ensure_dataset_dir(dataset_dir: &Path) -> Result<()> {
    if dataset_dir.exists() {
        return Ok(());
    }

    tokio::fs::create_dir_all(dataset_dir)
        .await
        .with_context(|| format!("Failed to create dataset directory {}", dataset_dir.display()))?;
    tracing::error!(
        path = %dataset_dir.display(),
        "dataset directory created; add SQL schema PDF files and retry"
    );

    Err(DatasetNotFound("Dataset directory is empty. Please add PDF files.".to_string()).into())
}
