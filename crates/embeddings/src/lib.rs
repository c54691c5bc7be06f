pub mod chunker;
pub mod fallback;
pub mod local;

pub use chunker::{ChunkConfig, TextChunk, TextChunker};
pub use fallback::FallbackEmbeddingProvider;
pub use local::{LocalEmbeddingClient, LocalEmbeddingConfig};
pub use sql_core::config::EmbeddingConfig;

use anyhow::Result;
use std::path::PathBuf;

type EmbedFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>>;

pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_>;
    fn dimension(&self) -> usize;
    /// Identifier recorded in a persisted index so it is only queried with the same model.
    fn model_id(&self) -> &str;
}

impl EmbeddingProvider for LocalEmbeddingClient {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(self.embed(texts))
    }
    fn dimension(&self) -> usize {
        self.dimension()
    }
    fn model_id(&self) -> &str {
        self.model_id()
    }
}

impl EmbeddingProvider for FallbackEmbeddingProvider {
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(self.embed(texts))
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
    fn model_id(&self) -> &str {
        self.model_id()
    }
}

pub async fn create_embedding_provider(
    cfg: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match cfg.provider.as_str() {
        "fastembed" | "local" => {
            let local_cfg = LocalEmbeddingConfig {
                model_id: cfg.model.clone(),
                cache_dir: cfg.cache_dir.as_ref().map(PathBuf::from),
                batch_size: cfg.batch_size,
            };
            let client = tokio::task::spawn_blocking(move || LocalEmbeddingClient::new(local_cfg))
                .await??;
            if let Some(expected) = cfg.dimensions {
                if expected != client.dimension() {
                    anyhow::bail!(
                        "Configured embedding dimension {} does not match model {} ({})",
                        expected,
                        client.model_id(),
                        client.dimension()
                    );
                }
            }
            Ok(Box::new(client))
        }
        "fallback" => {
            let dimension = cfg
                .dimensions
                .unwrap_or(fallback::STANDARD_DIMENSION);
            Ok(Box::new(FallbackEmbeddingProvider::new(dimension)))
        }
        other => anyhow::bail!("Unknown embedding provider: {other}"),
    }
}
