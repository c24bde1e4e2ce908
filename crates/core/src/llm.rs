use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::{error::InferenceFailure, provider::Provider};

/// One blocking chat-completion round trip.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, InferenceFailure>;
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct ChatClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        }
    }

    /// Build a client from the provider table, with optional overrides for
    /// the endpoint and the model.
    pub fn for_provider(
        provider: &Provider,
        api_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, InferenceFailure> {
        let config = provider.config();
        let api_key = provider.api_key()?;

        Ok(Self::new(
            api_url.unwrap_or_else(|| config.api_url.to_string()),
            model.unwrap_or_else(|| config.model.to_string()),
            api_key,
        ))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, InferenceFailure> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system,
                },
                {
                    "role": "user",
                    "content": user,
                },
            ],
            "temperature": temperature,
            "stream": false,
        });

        debug!(url = %self.api_url, model = %self.model, "chat completion request");

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceFailure::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| InferenceFailure::InvalidApiResponse(response.clone()))?;

        Ok(content.trim().to_string())
    }
}
