use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("provider error: {0}")] Provider(String),
    #[error("quota exceeded (429) for {model}: {detail}")] Quota { model: String, detail: String },
    #[error("unknown model: {0}")] UnknownModel(String),
    #[error("invalid input: {0}")] Validation(String),
    #[error("analysis failed: {0}")] Analysis(String),
    #[error("generation failed: {0}")] Generation(String),
    #[error("config error: {0}")] Config(String),
    #[error("cancelled")] Cancelled,
    #[error("http error: {0}")] Http(#[from] reqwest::Error),
    #[error("json error: {0}")] Json(#[from] serde_json::Error),
}

impl StudioError {
    /// Only quota errors move a request down the fallback chain.
    pub fn is_quota(&self) -> bool {
        matches!(self, StudioError::Quota { .. })
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
