//! OpenAI-compatible chat completions client backing `TextGenerator`.

use std::time::Duration;

use async_trait::async_trait;
use pawtrip_core::{render_prompt, PromptKind, PromptVars, ServiceError, TextGenerator};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::IntegrationConfig;
use crate::http::{build_client, ensure_success, map_transport_error};

const TEMPERATURE: f32 = 0.3;

pub struct OpenAiTextGenerator {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiTextGenerator {
    pub fn from_config(config: &IntegrationConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or(ServiceError::NotConfigured("openai text generator"))?;

        Ok(Self {
            http: build_client(config.http_timeout.max(Duration::from_secs(30)))?,
            api_key,
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            timeout: config.http_timeout.max(Duration::from_secs(30)),
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate_text(
        &self,
        kind: PromptKind,
        vars: &PromptVars,
    ) -> Result<String, ServiceError> {
        let prompt = render_prompt(kind, vars);
        debug!(kind = ?kind, model = %self.model, prompt_chars = prompt.chars().count(), "generate_text: called");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let body = ensure_success(response)
            .await?
            .json::<ChatResponse>()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> Result<String, ServiceError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ServiceError::InvalidResponse("completion without content".to_string()))
}
