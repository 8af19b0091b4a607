use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::coordinator::CoordinatorTask;
use crate::design::DesignProposal;
use crate::wire::GeneratedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analysis,
    Detection,
    Generation,
    Finalization,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    pub agent: String,
}

/// Everything the pipeline reports while it runs.
#[derive(Debug, Clone)]
pub enum StudioEvent {
    TaskUpdate(Vec<CoordinatorTask>),
    FilesGenerated(Vec<GeneratedFile>),
    DesignProposalUpdate(Option<DesignProposal>),
    Progress(Progress),
    Error(String),
}

pub type EventSender = mpsc::UnboundedSender<StudioEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<StudioEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send side that tolerates a missing or dropped receiver.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<EventSender>,
}

impl EventSink {
    pub fn new(tx: EventSender) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: StudioEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("event receiver dropped");
            }
        }
    }

    pub fn progress(&self, stage: Stage, percent: u8, message: &str, agent: &str) {
        tracing::debug!(?stage, percent, agent, "{message}");
        self.emit(StudioEvent::Progress(Progress {
            stage,
            percent,
            message: message.to_string(),
            agent: agent.to_string(),
        }));
    }
}

impl From<EventSender> for EventSink {
    fn from(tx: EventSender) -> Self {
        Self::new(tx)
    }
}
