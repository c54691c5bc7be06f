//! Sentence embeddings computed in-process via fastembed (ONNX runtime).

use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LocalEmbeddingConfig {
    pub model_id: String,
    pub cache_dir: Option<PathBuf>,
    pub batch_size: usize,
}

impl Default for LocalEmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            cache_dir: None,
            batch_size: 32,
        }
    }
}

/// Maps a Hugging Face model identifier to the fastembed model and its output dimension.
pub fn resolve_model(model_id: &str) -> Result<(EmbeddingModel, usize)> {
    match model_id {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "sentence-transformers/all-MiniLM-L12-v2" | "all-MiniLM-L12-v2" => {
            Ok((EmbeddingModel::AllMiniLML12V2, 384))
        }
        "BAAI/bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "BAAI/bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => anyhow::bail!("Unsupported embedding model: {other}"),
    }
}

/// fastembed's model is driven synchronously, so it is shared behind an Arc
/// and every call runs on the blocking pool.
pub struct LocalEmbeddingClient {
    model: Arc<TextEmbedding>,
    model_id: String,
    dimension: usize,
    batch_size: usize,
}

impl LocalEmbeddingClient {
    pub fn new(config: LocalEmbeddingConfig) -> Result<Self> {
        let (model_kind, dimension) = resolve_model(&config.model_id)?;

        tracing::info!(model = %config.model_id, "loading embedding model");

        let mut options = InitOptions::new(model_kind).with_show_download_progress(false);
        if let Some(cache_dir) = &config.cache_dir {
            options = options.with_cache_dir(cache_dir.clone());
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| anyhow::anyhow!("Failed to initialize embedding model: {e}"))?;

        Ok(Self {
            model: Arc::new(model),
            model_id: config.model_id,
            dimension,
            batch_size: config.batch_size.max(1),
        })
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = self.model.clone();
        let batch_size = self.batch_size;
        tokio::task::spawn_blocking(move || {
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Failed to compute embeddings: {e}"))
        })
        .await
        .context("embedding task failed")?
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
