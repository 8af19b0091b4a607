use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::errors::{Result, StudioError};
use super::{http_client, read_body, require_key, Provider};

/// `models/{model}:generateContent` over REST, key passed as query param.
pub struct Gemini {
    model: String,
    api_key: Option<String>,
    api_base: String,
    client: Client,
}

impl Gemini {
    pub fn new(cfg: &Config, model: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            api_key: cfg.gemini_api_key.clone(),
            api_base: cfg.gemini_base.clone(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<PartIn<'a>>,
}

#[derive(Serialize)]
struct PartIn<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartOut>,
}

#[derive(Deserialize)]
struct PartOut {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for Gemini {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, "VITE_GEMINI_API_KEY")?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![PartIn { text: prompt }] }],
        };

        tracing::debug!(%url, "POST generateContent");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let text = read_body(resp, &self.model).await?;

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| StudioError::Provider(format!("gemini response parse error: {e}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| StudioError::Provider("gemini: no candidates".into()))?;

        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
