use anyhow::Result;

/// Dimension of `sentence-transformers/all-MiniLM-L6-v2`, so fallback and
/// local vectors have the same shape.
pub const STANDARD_DIMENSION: usize = 384;

/// Fallback embeddings provider based on feature hashing.
/// Used for offline testing and development when no model download is possible.
///
/// Every lowercase alphanumeric token is hashed (FNV-1a) into one bucket and the
/// resulting term-count vector is L2-normalized, so texts sharing vocabulary
/// land close together under cosine similarity.
pub struct FallbackEmbeddingProvider {
    embedding_dim: usize,
    model_id: String,
}

impl FallbackEmbeddingProvider {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim,
            model_id: format!("fallback-hash-{embedding_dim}"),
        }
    }

    pub fn with_standard_dimension() -> Self {
        Self::new(STANDARD_DIMENSION)
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if self.embedding_dim == 0 {
            anyhow::bail!("fallback embedding dimension must be greater than zero");
        }

        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.embedding_dim];

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|token| !token.is_empty())
        {
            let bucket = (fnv1a(token.as_bytes()) % self.embedding_dim as u64) as usize;
            embedding[bucket] += 1.0;
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        } else {
            // Token-free input still gets a unit vector.
            embedding[0] = 1.0;
        }

        embedding
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dim
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
