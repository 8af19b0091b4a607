use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Result;
use super::{http_client, read_body, Provider};

/// Local model served by Ollama's `/api/chat`, non-streaming.
pub struct Ollama {
    model: String,
    url: String,
    client: Client,
}

impl Ollama {
    pub fn new(url: &str, model: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            url: url.to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

#[async_trait]
impl Provider for Ollama {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Msg { role: "user", content: prompt }],
            stream: false,
        };

        tracing::debug!(%url, model = %self.model, "POST chat");
        let resp = self.client.post(&url).json(&body).send().await?;
        let text = read_body(resp, &self.model).await?;

        // Some builds answer with the bare text.
        Ok(match serde_json::from_str::<ChatResponse>(&text) {
            Ok(c) => c.message.content,
            Err(_) => text,
        })
    }
}
