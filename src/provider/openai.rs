use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{Result, StudioError};
use super::{http_client, read_body, require_key, Provider};

/// Chat-completions endpoint; an optional system message precedes the prompt.
pub struct OpenAi {
    model: String,
    api_base: String,
    api_key: Option<String>,
    system: Option<String>,
    client: Client,
}

impl OpenAi {
    pub fn new(cfg: &Config, model: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            api_base: cfg.openai_base.clone(),
            api_key: cfg.openai_api_key.clone(),
            system: None,
            client: http_client(timeout)?,
        })
    }

    pub fn with_system(mut self, system: Option<&str>) -> Self {
        self.system = system.map(str::to_string);
        self
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl Provider for OpenAi {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, "OPENAI_API_KEY")?;
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));
        let body = json!({ "model": self.model, "messages": messages });

        tracing::debug!(%url, model = %self.model, "POST chat completion");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let text = read_body(resp, &self.model).await?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| StudioError::Provider(format!("failed to parse OpenAI response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
