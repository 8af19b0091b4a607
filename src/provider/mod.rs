use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::errors::{Result, StudioError};
use crate::wire::AiResponse;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod scripted;

/// One wire shape. Returns the raw assistant text.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

pub type DynProvider = Arc<dyn Provider + Send + Sync>;

pub(crate) fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    Ok(builder.build()?)
}

/// Reads the body, mapping 429 to a quota error and any other non-2xx to a
/// provider error carrying the status and body.
pub(crate) async fn read_body(resp: Response, model: &str) -> Result<String> {
    let status = resp.status();
    let text = resp.text().await?;
    tracing::debug!(model, %status, bytes = text.len(), "provider response");

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(StudioError::Quota { model: model.to_string(), detail: text });
    }
    if !status.is_success() {
        return Err(StudioError::Provider(format!("{model} API error ({status}): {text}")));
    }
    Ok(text)
}

pub(crate) fn require_key(key: &Option<String>, var: &str) -> Result<String> {
    key.clone()
        .ok_or_else(|| StudioError::Provider(format!("{var} env var is not set")))
}

/// Whether an instruction asks for a whole project rather than a snippet.
pub fn is_project_request(instruction: &str) -> bool {
    let lower = instruction.to_lowercase();
    lower.contains("crea")
        && ["proyecto", "aplicación", "programa", "calculadora", "juego", "web"]
            .iter()
            .any(|w| lower.contains(w))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    Gemini,
    Anthropic,
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Gemini => "gemini",
            Backend::Anthropic => "anthropic",
            Backend::Ollama => "ollama",
        }
    }

    pub fn has_credentials(&self, cfg: &Config) -> bool {
        match self {
            Backend::OpenAi => cfg.openai_api_key.is_some(),
            Backend::Gemini => cfg.gemini_api_key.is_some(),
            Backend::Anthropic => cfg.anthropic_api_key.is_some(),
            Backend::Ollama => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub name: &'static str,
    pub backend: Backend,
    /// Backend model id; Ollama takes `ollama_model` from the config instead.
    pub model_id: &'static str,
}

pub const MODELS: [ModelInfo; 7] = [
    ModelInfo { name: "GPT-4O", backend: Backend::OpenAi, model_id: "gpt-4o" },
    ModelInfo { name: "GPT-O3 Mini", backend: Backend::OpenAi, model_id: "gpt-3.5-turbo" },
    ModelInfo { name: "Gemini 2.5 Flash", backend: Backend::Gemini, model_id: "gemini-1.5-flash" },
    ModelInfo { name: "Gemini 2.0 Flash", backend: Backend::Gemini, model_id: "gemini-1.0-pro" },
    ModelInfo { name: "Claude 3.7", backend: Backend::Anthropic, model_id: "claude-3-opus-20240229" },
    ModelInfo { name: "Claude 3.5 Sonnet V2", backend: Backend::Anthropic, model_id: "claude-3-sonnet-20240229" },
    ModelInfo { name: "Qwen2.5-Omni-7B", backend: Backend::Ollama, model_id: "qwen2.5:7b" },
];

/// Display name to provider table plus the quota fallback order.
pub struct ModelRegistry {
    models: BTreeMap<String, DynProvider>,
    fallback_order: Vec<String>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(Config::default().fallback_order)
    }
}

impl ModelRegistry {
    pub fn new(fallback_order: Vec<String>) -> Self {
        Self { models: BTreeMap::new(), fallback_order }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: DynProvider) -> &mut Self {
        self.models.insert(name.into(), provider);
        self
    }

    pub fn with(mut self, name: impl Into<String>, provider: DynProvider) -> Self {
        self.register(name, provider);
        self
    }

    /// The studio models wired to their HTTP backends.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = cfg.timeout();
        let mut reg = Self::new(cfg.fallback_order.clone());

        for info in &MODELS {
            let provider: DynProvider = match info.backend {
                Backend::OpenAi => Arc::new(
                    openai::OpenAi::new(cfg, info.model_id, timeout)?
                        .with_system(crate::prompt::system_prompt_for(info.name)),
                ),
                Backend::Gemini => Arc::new(gemini::Gemini::new(cfg, info.model_id, timeout)?),
                Backend::Anthropic => Arc::new(anthropic::Anthropic::new(cfg, info.model_id, timeout)?),
                Backend::Ollama => Arc::new(ollama::Ollama::new(&cfg.ollama_url, &cfg.ollama_model, timeout)?),
            };
            reg.register(info.name, provider);
        }
        Ok(reg)
    }

    /// Same names as [`ModelRegistry::from_config`], every model replying
    /// with nothing, so each generated file becomes a placeholder.
    pub fn offline(cfg: &Config) -> Self {
        let mut reg = Self::new(cfg.fallback_order.clone());
        for info in &MODELS {
            reg.register(info.name, Arc::new(scripted::ScriptedProvider::new().with_reply("")));
        }
        reg
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn fallback_order(&self) -> &[String] {
        &self.fallback_order
    }

    /// Sends the prompt to one model, no fallback.
    pub async fn process_instruction(&self, prompt: &str, model: &str) -> Result<AiResponse> {
        let provider = self
            .models
            .get(model)
            .ok_or_else(|| StudioError::UnknownModel(model.to_string()))?;

        tracing::info!(model, "invoking model");
        let started = Instant::now();
        let content = provider.invoke(prompt).await?;
        let elapsed = started.elapsed().as_millis() as u64;

        Ok(AiResponse {
            content,
            model: model.to_string(),
            error: None,
            fallback_used: false,
            execution_time_ms: Some(elapsed),
            is_project_request: is_project_request(prompt),
        })
    }

    /// Tries `model`; on a quota error walks the fallback order, skipping
    /// `model`. Other errors are returned as-is. When every fallback fails
    /// the last error is returned.
    pub async fn try_with_fallback(&self, prompt: &str, model: &str) -> Result<AiResponse> {
        let err = match self.process_instruction(prompt, model).await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_quota() => e,
            Err(e) => return Err(e),
        };
        tracing::warn!(model, "quota exceeded, trying fallback models");

        let mut last = err;
        for candidate in self.fallback_order.iter().filter(|m| m.as_str() != model) {
            tracing::info!(model = %candidate, "trying fallback model");
            match self.process_instruction(prompt, candidate).await {
                Ok(mut resp) => {
                    resp.fallback_used = true;
                    return Ok(resp);
                }
                Err(e) => {
                    tracing::warn!(model = %candidate, error = %e, "fallback model failed");
                    last = e;
                }
            }
        }
        Err(last)
    }
}
