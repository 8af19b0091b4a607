use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, StudioError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name of the model used when the caller does not pick one.
    pub model: String,
    pub fallback_order: Vec<String>,
    /// Per-request timeout; 0 disables it.
    pub timeout_secs: u64,
    pub out_dir: String,
    pub max_code_length: usize,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_base: String,
    pub anthropic_base: String,
    pub anthropic_version: String,
    pub anthropic_max_tokens: u32,
    pub gemini_base: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "GPT-4O".into(),
            fallback_order: vec![
                "Gemini 2.5 Flash".into(),
                "Gemini 2.0 Flash".into(),
                "Claude 3.5 Sonnet V2".into(),
                "Qwen2.5-Omni-7B".into(),
            ],
            timeout_secs: 0,
            out_dir: "codestorm-out".into(),
            max_code_length: 100_000,
            openai_api_key: None,
            anthropic_api_key: None,
            gemini_api_key: None,
            openai_base: "https://api.openai.com/v1".into(),
            anthropic_base: "https://api.anthropic.com".into(),
            anthropic_version: "2023-06-01".into(),
            anthropic_max_tokens: 1024,
            gemini_base: "https://generativelanguage.googleapis.com".into(),
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "qwen2.5:7b".into(),
        }
    }
}

impl Config {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs_err::read_to_string(path)
            .map_err(|e| StudioError::Config(e.to_string()))?;
        toml::from_str(&text)
            .map_err(|e| StudioError::Config(format!("{}: {e}", path.display())))
    }

    /// Optional TOML file, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_with(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Overrides from a key lookup; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(v) = first(&["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"]) {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = first(&["ANTHROPIC_API_KEY", "VITE_ANTHROPIC_API_KEY"]) {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = first(&["VITE_GEMINI_API_KEY", "GEMINI_API_KEY"]) {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = first(&["CODESTORM_OPENAI_BASE"]) {
            self.openai_base = v;
        }
        if let Some(v) = first(&["CODESTORM_ANTHROPIC_BASE"]) {
            self.anthropic_base = v;
        }
        if let Some(v) = first(&["CODESTORM_GEMINI_BASE"]) {
            self.gemini_base = v;
        }
        if let Some(v) = first(&["CODESTORM_OLLAMA_URL"]) {
            self.ollama_url = v;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_keys_and_bases() {
        let env: HashMap<&str, &str> = [
            ("VITE_OPENAI_API_KEY", "sk-vite"),
            ("GEMINI_API_KEY", "g-key"),
            ("CODESTORM_ANTHROPIC_BASE", "http://127.0.0.1:3001/api/anthropic"),
            ("ANTHROPIC_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.openai_api_key.as_deref(), Some("sk-vite"));
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("g-key"));
        assert_eq!(cfg.anthropic_api_key, None);
        assert_eq!(cfg.anthropic_base, "http://127.0.0.1:3001/api/anthropic");
        assert_eq!(cfg.openai_base, "https://api.openai.com/v1");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codestorm.toml");
        std::fs::write(&path, "model = \"Claude 3.7\"\ntimeout_secs = 30\n").unwrap();

        let cfg = Config::from_toml_file(&path).unwrap();
        assert_eq!(cfg.model, "Claude 3.7");
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.fallback_order.len(), 4);
        assert_eq!(Config::default().timeout(), None);
    }

    #[test]
    fn unknown_keys_are_ignored_and_not_written() {
        let cfg: Config = toml::from_str("schema_version = \"2025-10-01\"\nout_dir = \"site\"\n").unwrap();
        assert_eq!(cfg.out_dir, "site");
        let written = toml::to_string(&cfg).unwrap();
        assert!(!written.contains("schema_version"));
    }
}
