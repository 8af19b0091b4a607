use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::errors::{Result, StudioError};
use super::Provider;

#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Quota,
    Fail(String),
}

/// Canned replies, consumed in order; the last step repeats once the queue
/// runs dry. Used by tests and `--offline` runs.
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.steps.lock().push_back(Step::Reply(text.into()));
        self
    }

    pub fn with_quota_error(self) -> Self {
        self.steps.lock().push_back(Step::Quota);
        self
    }

    pub fn with_error(self, msg: impl Into<String>) -> Self {
        self.steps.lock().push_back(Step::Fail(msg.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        let step = {
            let next = self.steps.lock().pop_front();
            let mut last = self.last.lock();
            match next {
                Some(s) => {
                    *last = Some(s.clone());
                    s
                }
                None => last
                    .clone()
                    .ok_or_else(|| StudioError::Provider("scripted provider has no replies".into()))?,
            }
        };

        match step {
            Step::Reply(text) => Ok(text),
            Step::Quota => Err(StudioError::Quota {
                model: "scripted".into(),
                detail: "429 Too Many Requests".into(),
            }),
            Step::Fail(msg) => Err(StudioError::Provider(msg)),
        }
    }
}
