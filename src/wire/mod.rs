use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ========================================
/// Types exchanged between the pipeline stages
/// ========================================

/// Planning-time request for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescription {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl FileDescription {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackCategory {
    Frontend,
    Backend,
    Fullstack,
    Mobile,
    Desktop,
    Ai,
    Blockchain,
    #[serde(other)]
    Other,
}

impl StackCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackCategory::Frontend => "frontend",
            StackCategory::Backend => "backend",
            StackCategory::Fullstack => "fullstack",
            StackCategory::Mobile => "mobile",
            StackCategory::Desktop => "desktop",
            StackCategory::Ai => "ai",
            StackCategory::Blockchain => "blockchain",
            StackCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "frontend" => StackCategory::Frontend,
            "backend" => StackCategory::Backend,
            "fullstack" => StackCategory::Fullstack,
            "mobile" => StackCategory::Mobile,
            "desktop" => StackCategory::Desktop,
            "ai" => StackCategory::Ai,
            "blockchain" => StackCategory::Blockchain,
            _ => StackCategory::Other,
        }
    }
}

fn default_complexity() -> String {
    "intermediate".into()
}

fn default_category() -> StackCategory {
    StackCategory::Other
}

/// Technology stack picked by the user; biases the generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: StackCategory,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_complexity")]
    pub complexity: String,
}

/// Where a file body came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileOrigin {
    Generated,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub id: String,
    pub name: String,
    pub path: String,
    pub content: String,
    pub language: String,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub origin: FileOrigin,
}

impl GeneratedFile {
    pub fn new(path: &str, content: String, language: String, origin: FileOrigin) -> Self {
        let now = Utc::now();
        Self {
            id: format!("file-{}", Uuid::new_v4()),
            name: file_name(path).to_string(),
            path: path.to_string(),
            content,
            language,
            is_new: true,
            created_at: now,
            modified_at: now,
            origin,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, FileOrigin::Fallback { .. })
    }
}

/// Last path segment, `/`-separated.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Normalized answer of any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub is_project_request: bool,
}

impl AiResponse {
    pub fn failed(model: &str, error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model: model.to_string(),
            error: Some(error.into()),
            fallback_used: false,
            execution_time_ms: None,
            is_project_request: false,
        }
    }
}
