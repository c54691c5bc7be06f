use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ErrorResponse, ModelConfig,
};
use anyhow::{Context, Result};
use log::{error, info};
use reqwest::Client;
use std::time::Duration;

/// Client for Groq's OpenAI-compatible chat completion endpoint.
pub struct GroqClient {
    client: Client,
    config: ModelConfig,
    api_key: String,
}

impl GroqClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("Groq API key is missing; set GROQ_API_KEY or llm.api_key")
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        info!("Initializing GroqClient for model {}", config.model);
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Sends `messages` and returns the text of the first choice.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest::new(messages, &self.config);
        info!("Sending request to Groq model: {}", request.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Groq send error: {:?}", e);
                anyhow::Error::new(e).context("Failed to send request to Groq")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!("Groq API returned error {}: {}", status, message);
            anyhow::bail!("Groq API returned error {}: {}", status, message);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq API response")?;

        info!("Received response from Groq model: {}", request.model);
        completion
            .into_text()
            .ok_or_else(|| anyhow::anyhow!("Groq response contained no message"))
    }
}
