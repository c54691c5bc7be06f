pub mod groq;
pub mod models;

pub use groq::GroqClient;
pub use models::{ChatMessage, ModelConfig};

use anyhow::Result;
use async_trait::async_trait;
use sql_core::config::LlmConfig;

/// A chat model that turns a single rendered prompt into a completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    fn model_name(&self) -> &str {
        &self.config().model
    }
}

pub fn create_chat_model(cfg: &LlmConfig) -> Result<Box<dyn ChatModel>> {
    match cfg.provider.as_str() {
        "groq" | "openai" => Ok(Box::new(GroqClient::new(ModelConfig::from(cfg))?)),
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}
