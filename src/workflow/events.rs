use ripvault_common::{WorkflowKey, WorkflowStatus};
use ripvault_mkv::RipProgress;
use serde::{Deserialize, Serialize};

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CAPACITY: usize = 256;

/// Observable workflow activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A workflow was persisted with a new status.
    StatusChanged {
        #[serde(flatten)]
        key: WorkflowKey,
        status: WorkflowStatus,
    },
    /// The ripping engine reported progress.
    RipProgress {
        #[serde(flatten)]
        key: WorkflowKey,
        progress: RipProgress,
    },
    /// One destination finished; `error` is set when it failed.
    IngestFinished {
        #[serde(flatten)]
        key: WorkflowKey,
        target: String,
        error: Option<String>,
    },
}

impl WorkflowEvent {
    pub fn key(&self) -> &WorkflowKey {
        match self {
            Self::StatusChanged { key, .. }
            | Self::RipProgress { key, .. }
            | Self::IngestFinished { key, .. } => key,
        }
    }
}
