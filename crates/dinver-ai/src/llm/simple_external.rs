//! External API provider for OpenAI-compatible and Anthropic endpoints.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ApiProvider, GenerationConfig, TextGenerator};

pub struct SimpleExternalProvider {
    provider: ApiProvider,
    api_key: String,
    model: String,
    config: GenerationConfig,
    client: Client,
}

impl SimpleExternalProvider {
    /// Parse a response body as JSON, returning a clear error if the server returned HTML
    /// (e.g. a gateway error page) instead of valid JSON.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;

        // CDNs/proxies sometimes answer 200 with an HTML page
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}). Response: {}",
                endpoint,
                status,
                preview
            ));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Response body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }

    pub fn new(
        provider: ApiProvider,
        api_key: String,
        model: String,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        tracing::info!(
            provider = ?provider,
            model = %model,
            timeout_secs = timeout.as_secs(),
            "Creating SimpleExternalProvider"
        );

        Ok(Self {
            provider,
            api_key,
            model,
            config,
            client,
        })
    }

    fn endpoint(&self) -> String {
        match &self.provider {
            ApiProvider::OpenAI => "https://api.openai.com/v1/chat/completions".to_string(),
            ApiProvider::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
            ApiProvider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions".to_string(),
            ApiProvider::Ollama => "http://localhost:11434/v1/chat/completions".to_string(),
            ApiProvider::Custom { endpoint } => endpoint.clone(),
        }
    }

    fn map_send_error(endpoint: &str, e: reqwest::Error) -> anyhow::Error {
        if e.is_timeout() {
            tracing::warn!(endpoint = %endpoint, "Generation request timed out");
            anyhow!("Request to {} timed out", endpoint)
        } else if e.is_connect() {
            tracing::warn!(endpoint = %endpoint, error = %e, "Connection failed");
            anyhow!("Failed to connect to {}: {}", endpoint, e)
        } else {
            tracing::warn!(endpoint = %endpoint, error = %e, "Request failed");
            anyhow!("Request to {} failed: {}", endpoint, e)
        }
    }

    async fn openai_compatible_generate(
        &self,
        system_prompt: &str,
        user_content: &str,
        json_output: bool,
    ) -> Result<String> {
        let endpoint = self.endpoint();
        tracing::debug!(
            endpoint = %endpoint,
            model = %self.model,
            max_tokens = self.config.max_tokens,
            user_len = user_content.len(),
            "Sending OpenAI-compatible request"
        );

        let mut request = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false
        });
        if json_output {
            request["response_format"] = json!({"type": "json_object"});
        }

        let mut builder = self.client.post(&endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_send_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            tracing::warn!(endpoint = %endpoint, status = %status, error = %error, "API returned error");
            return Err(anyhow!("API error ({}): {}", status, error));
        }

        let result: OpenAIResponse = Self::parse_json_response(response, &endpoint).await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("No choices returned from API"))?;

        tracing::debug!(chars = content.len(), "API response received");
        Ok(content)
    }

    async fn anthropic_generate(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let endpoint = self.endpoint();
        let request = json!({
            "model": self.model,
            "system": system_prompt,
            "messages": [
                {"role": "user", "content": user_content}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });

        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await?;
            return Err(anyhow!("Anthropic API error ({}): {}", status, error));
        }

        let result: AnthropicResponse = Self::parse_json_response(response, &endpoint).await?;
        result
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| anyhow!("No content returned from Anthropic API"))
    }

    async fn dispatch(&self, system_prompt: &str, user_content: &str, json_output: bool) -> Result<String> {
        match &self.provider {
            ApiProvider::Anthropic => self.anthropic_generate(system_prompt, user_content).await,
            ApiProvider::OpenAI
            | ApiProvider::OpenRouter
            | ApiProvider::Ollama
            | ApiProvider::Custom { .. } => {
                self.openai_compatible_generate(system_prompt, user_content, json_output)
                    .await
            }
        }
    }
}

#[async_trait]
impl TextGenerator for SimpleExternalProvider {
    async fn generate(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        self.dispatch(system_prompt, user_content, self.config.json_output)
            .await
    }

    async fn generate_json(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        self.dispatch(system_prompt, user_content, true).await
    }

    fn name(&self) -> String {
        format!("{:?}/{}", self.provider, self.model)
    }
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}
