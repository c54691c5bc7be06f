use crate::errors::InferenceError;
use crate::prompt::{build_sql_prompt, stuff_documents};
use anyhow::{Context, Result};
use embeddings::{create_embedding_provider, ChunkConfig, EmbeddingProvider};
use llm::{create_chat_model, ChatModel};
use log::{error, info};
use sql_core::{config::Config, Question};
use tokio::sync::Mutex;
use vector_store::{DatasetNotFound, IndexBuilder, IndexSettings, VectorStore};

type EmbeddingClient = Box<dyn EmbeddingProvider>;
type LlmClient = Box<dyn ChatModel>;

/// Index locations and chunking parameters taken from `config`.
pub fn index_settings(config: &Config) -> IndexSettings {
    IndexSettings {
        dataset_dir: config.data.dataset_dir.clone().into(),
        persist_dir: config.vector_store.persist_dir.clone().into(),
        chunk: ChunkConfig {
            chunk_size: config.data.chunk_size,
            overlap_size: config.data.chunk_overlap,
        },
        batch_size: config.embedding.batch_size,
    }
}

/// Retrieval-augmented SQL generation: question in, SQL text out.
pub struct SqlGenerator {
    embeddings_client: EmbeddingClient,
    llm_client: LlmClient,
    index_settings: IndexSettings,
    top_k: usize,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for SqlGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlGenerator")
            .field("embeddings_client", &self.embeddings_client.model_id())
            .field("llm_client", &self.llm_client.model_name())
            .field("index_settings", &self.index_settings)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl SqlGenerator {
    pub async fn new(config: &Config) -> Result<Self> {
        let embeddings_client = create_embedding_provider(&config.embedding)
            .await
            .context("Failed to create embedding provider")?;

        let llm_client = create_chat_model(&config.llm).context("Failed to create LLM client")?;

        Ok(Self::with_clients(config, embeddings_client, llm_client))
    }

    // Dependency-injection friendly constructor for testing and composition
    pub fn with_clients(
        config: &Config,
        embeddings_client: EmbeddingClient,
        llm_client: LlmClient,
    ) -> Self {
        Self {
            embeddings_client,
            llm_client,
            index_settings: index_settings(config),
            top_k: config.vector_store.top_k,
            build_lock: Mutex::new(()),
        }
    }

    pub fn index_settings(&self) -> &IndexSettings {
        &self.index_settings
    }

    /// Turns a natural-language question into SQL text, trimmed of surrounding whitespace.
    pub async fn generate_sql_query(&self, query: &str) -> Result<String, InferenceError> {
        let question = Question::parse(query)?;
        info!("Generating SQL for question: {}", question);

        let store = self.vector_store().await?;
        let retrieved = self.retrieve(&store, &question).await;
        store.close().await;
        let retrieved = retrieved?;

        let context = stuff_documents(&retrieved);
        let prompt = build_sql_prompt(&context, question.as_str());

        let completion = self.llm_client.complete(&prompt).await.map_err(|e| {
            error!("LLM call failed: {:#}", e);
            InferenceError::Llm(format!("{e:#}"))
        })?;

        let sql = completion.trim().to_string();
        info!("Generated SQL query ({} chars)", sql.len());
        Ok(sql)
    }

    async fn retrieve(
        &self,
        store: &VectorStore,
        question: &Question,
    ) -> Result<Vec<vector_store::SearchResult>, InferenceError> {
        let query_embedding = self
            .embeddings_client
            .embed(vec![question.as_str().to_string()])
            .await
            .map_err(|e| {
                error!("Failed to embed question: {:#}", e);
                InferenceError::Embedding(format!("{e:#}"))
            })?
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::Embedding("no embedding returned".to_string()))?;

        store
            .search_similar(&query_embedding, self.top_k)
            .await
            .map_err(|e| {
                error!("Similarity search failed: {:#}", e);
                InferenceError::VectorStore(format!("{e:#}"))
            })
    }

    /// Loads the persisted index, building it first when absent. Concurrent
    /// callers wait for a single build instead of racing on the directory.
    async fn vector_store(&self) -> Result<VectorStore, InferenceError> {
        let builder = IndexBuilder::new(&self.index_settings, self.embeddings_client.as_ref());

        let result = if self.index_settings.persist_dir.exists() {
            builder.load().await
        } else {
            let _guard = self.build_lock.lock().await;
            builder.load_or_build().await
        };

        result.map_err(|e| {
            if let Some(missing) = e.downcast_ref::<DatasetNotFound>() {
                error!("{}", missing);
                InferenceError::DatasetNotFound(missing.0.clone())
            } else {
                error!("Error loading or creating vector database: {:#}", e);
                InferenceError::VectorStore(format!("{e:#}"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use embeddings::FallbackEmbeddingProvider;
    use std::sync::{Arc, Mutex as StdMutex};
    use tempfile::TempDir;
    use vector_store::SourcePage;

    #[derive(Clone, Default)]
    struct ScriptedModel {
        reply: String,
        prompts: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("Groq API returned error 503 Service Unavailable: overloaded")
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.data.dataset_dir = root.join("dataset").to_string_lossy().to_string();
        config.vector_store.persist_dir = root.join("chroma_db").to_string_lossy().to_string();
        config.embedding.provider = "fallback".to_string();
        config
    }

    async fn prebuilt_generator(root: &std::path::Path, llm_client: LlmClient) -> SqlGenerator {
        let config = test_config(root);
        let generator = SqlGenerator::with_clients(
            &config,
            Box::new(FallbackEmbeddingProvider::new(64)),
            llm_client,
        );

        let pages = vec![
            SourcePage::new(
                "schema.pdf",
                1,
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);",
            ),
            SourcePage::new(
                "schema.pdf",
                2,
                "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, total NUMERIC);",
            ),
        ];
        IndexBuilder::new(
            generator.index_settings(),
            generator.embeddings_client.as_ref(),
        )
        .build_from_pages(&pages)
        .await
        .unwrap()
        .close()
        .await;

        generator
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn should_produce_send_futures_for_request_handlers() {
        let temp_dir = TempDir::new().unwrap();
        let generator = SqlGenerator::with_clients(
            &test_config(temp_dir.path()),
            Box::new(FallbackEmbeddingProvider::new(64)),
            Box::new(ScriptedModel::default()),
        );
        let settings = index_settings(&test_config(temp_dir.path()));
        let embedder = FallbackEmbeddingProvider::new(64);

        assert_send(generator.generate_sql_query("show all users"));
        assert_send(IndexBuilder::new(&settings, &embedder).load_or_build());
        assert_send(VectorStore::open(&settings.persist_dir));
    }

    #[test]
    fn should_map_config_to_index_settings() {
        let mut config = Config::default();
        config.data.chunk_size = 400;
        config.data.chunk_overlap = 40;
        config.embedding.batch_size = 8;

        let settings = index_settings(&config);
        assert_eq!(settings.dataset_dir, std::path::PathBuf::from("./dataset"));
        assert_eq!(settings.persist_dir, std::path::PathBuf::from("./chroma_db"));
        assert_eq!(settings.chunk.chunk_size, 400);
        assert_eq!(settings.chunk.overlap_size, 40);
        assert_eq!(settings.batch_size, 8);
    }

    #[tokio::test]
    async fn should_reject_blank_question() {
        let temp_dir = TempDir::new().unwrap();
        let generator = SqlGenerator::with_clients(
            &test_config(temp_dir.path()),
            Box::new(FallbackEmbeddingProvider::new(64)),
            Box::new(ScriptedModel::default()),
        );

        let err = generator.generate_sql_query("   ").await.unwrap_err();
        assert!(matches!(err, InferenceError::InvalidQuery(_)));
        assert!(!temp_dir.path().join("dataset").exists());
    }

    #[tokio::test]
    async fn should_report_missing_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let generator = SqlGenerator::with_clients(
            &test_config(temp_dir.path()),
            Box::new(FallbackEmbeddingProvider::new(64)),
            Box::new(ScriptedModel::default()),
        );

        let err = generator
            .generate_sql_query("show all users")
            .await
            .unwrap_err();

        match err {
            InferenceError::DatasetNotFound(message) => {
                assert_eq!(message, "Dataset directory is empty. Please add PDF files.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(temp_dir.path().join("dataset").is_dir());
    }

    #[tokio::test]
    async fn should_generate_trimmed_sql_from_retrieved_context() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel {
            reply: "\n  SELECT * FROM users;  \n".to_string(),
            ..ScriptedModel::default()
        };
        let prompts = model.prompts.clone();
        let generator = prebuilt_generator(temp_dir.path(), Box::new(model)).await;

        let sql = generator
            .generate_sql_query("show all users")
            .await
            .unwrap();

        assert_eq!(sql, "SELECT * FROM users;");
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("CREATE TABLE users"));
        assert!(prompts[0].contains("User Question: show all users\n"));
        assert!(prompts[0].ends_with("SQL Query: "));
    }

    #[tokio::test]
    async fn should_limit_context_to_top_k_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel {
            reply: "SELECT 1;".to_string(),
            ..ScriptedModel::default()
        };
        let prompts = model.prompts.clone();
        let mut generator = prebuilt_generator(temp_dir.path(), Box::new(model)).await;
        generator.top_k = 1;

        generator.generate_sql_query("orders total").await.unwrap();

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts[0].matches("CREATE TABLE").count(), 1);
    }

    #[tokio::test]
    async fn should_wrap_llm_failures() {
        let temp_dir = TempDir::new().unwrap();
        let generator = prebuilt_generator(temp_dir.path(), Box::new(FailingModel)).await;

        let err = generator
            .generate_sql_query("show all users")
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Llm(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn should_serialize_concurrent_cold_start_builds() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Arc::new(SqlGenerator::with_clients(
            &test_config(temp_dir.path()),
            Box::new(FallbackEmbeddingProvider::new(64)),
            Box::new(ScriptedModel::default()),
        ));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                tokio::spawn(async move { generator.generate_sql_query("show all users").await })
            })
            .collect();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(err, InferenceError::DatasetNotFound(_)));
        }
        assert!(!temp_dir.path().join("chroma_db").exists());
        assert!(!temp_dir.path().join("chroma_db.building").exists());
    }
}
