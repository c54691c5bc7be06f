use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text of a single PDF page with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePage {
    pub file_name: String,
    /// 1-based page number
    pub page: usize,
    pub text: String,
}

impl SourcePage {
    pub fn new(file_name: impl Into<String>, page: usize, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            page,
            text: text.into(),
        }
    }
}

/// A stored chunk as returned by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    pub page: usize,
    pub chunk_id: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A chunk ready to be written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub file_name: String,
    pub page: usize,
    pub chunk_id: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl DocumentChunk {
    pub fn new(
        file_name: String,
        page: usize,
        chunk_id: usize,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            file_name,
            page,
            chunk_id,
            content,
            embedding,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub similarity: f32,
}

impl SearchResult {
    pub fn new(document: Document, similarity: f32) -> Self {
        Self {
            document,
            similarity,
        }
    }
}

/// Identifies the embedding space an index was built in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn new(embedding_model: impl Into<String>, dimension: usize) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            dimension,
            created_at: Utc::now(),
        }
    }

    pub fn is_compatible_with(&self, embedding_model: &str, dimension: usize) -> bool {
        self.embedding_model == embedding_model && self.dimension == dimension
    }
}
