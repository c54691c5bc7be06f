use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub vector_store: VectorStoreConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `fastembed` runs the model locally, `fallback` hashes tokens (offline/testing).
    pub provider: String,
    pub model: String,
    pub dimensions: Option<usize>,
    pub cache_dir: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: None,
            cache_dir: None,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub persist_dir: String,
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: "./chroma_db".to_string(),
            top_k: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dataset_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_dir: "./dataset".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_from_env() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| Self::default_config_path());
        Self::load(Path::new(&config_path))
    }

    pub fn default_config_path() -> String {
        "./config.toml".to_string()
    }

    pub fn with_env_overrides(&self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides(&self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = self.clone();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(key) = lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty()) {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(dir) = lookup("VECTOR_DB_DIR") {
            config.vector_store.persist_dir = dir;
        }
        if let Some(dir) = lookup("DATASET_DIR") {
            config.data.dataset_dir = dir;
        }

        config
    }
}
