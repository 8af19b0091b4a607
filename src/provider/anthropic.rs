use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{Result, StudioError};
use super::{http_client, read_body, require_key, Provider};

pub struct Anthropic {
    model: String,
    api_key: Option<String>,
    api_base: String,
    api_version: String,
    max_tokens: u32,
    client: Client,
}

impl Anthropic {
    pub fn new(cfg: &Config, model: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            api_key: cfg.anthropic_api_key.clone(),
            api_base: cfg.anthropic_base.clone(),
            api_version: cfg.anthropic_version.clone(),
            max_tokens: cfg.anthropic_max_tokens,
            client: http_client(timeout)?,
        })
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for Anthropic {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, "ANTHROPIC_API_KEY")?;
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Msg { role: "user", content: prompt }],
        };

        tracing::debug!(%url, model = %self.model, "POST messages");
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await?;
        let text = read_body(resp, &self.model).await?;

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| StudioError::Provider(format!("anthropic response parse error: {e}")))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .ok_or_else(|| StudioError::Provider("anthropic: empty content".into()))
    }
}
