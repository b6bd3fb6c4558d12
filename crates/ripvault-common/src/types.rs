//! Core type definitions for the drive, workflows, and ripped artifacts.
//!
//! Status enums are serialized in lowercase; the same strings are stored in
//! the `workflows.status` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ids::WorkflowKey;

/// State of the single physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveStatus {
    /// No medium present.
    #[default]
    Empty,
    /// Scanning the disc table of contents.
    Reading,
    /// Ripping a title.
    Mkv,
    /// Medium present and idle.
    Ready,
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Reading => write!(f, "reading"),
            Self::Mkv => write!(f, "mkv"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Lifecycle status of a workflow.
///
/// `Start -> Ripping -> Pending -> Importing -> Done`, with `Ripping -> Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Start,
    Ripping,
    Pending,
    Importing,
    Done,
    Error,
}

impl WorkflowStatus {
    /// Whether `next` is a forward edge of the status graph.
    ///
    /// `Error -> Ripping` is the operator retry edge. Restart recovery does
    /// not go through this check.
    pub fn can_advance_to(self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, next),
            (Start, Ripping)
                | (Error, Ripping)
                | (Ripping, Pending)
                | (Ripping, Error)
                | (Pending, Importing)
                | (Importing, Done)
        )
    }

    /// Whether a rip or ingest owns this workflow.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Ripping | Self::Importing)
    }

    /// Status a workflow found at startup is reset to, if it was interrupted.
    pub fn recovered(self) -> Option<WorkflowStatus> {
        match self {
            Self::Ripping => Some(Self::Error),
            Self::Importing => Some(Self::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Ripping => write!(f, "ripping"),
            Self::Pending => write!(f, "pending"),
            Self::Importing => write!(f, "importing"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "ripping" => Ok(Self::Ripping),
            "pending" => Ok(Self::Pending),
            "importing" => Ok(Self::Importing),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown workflow status: {}", s)),
        }
    }
}

/// A mounted medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disc {
    /// Volume UUID.
    pub uuid: String,
    /// Volume label.
    pub label: String,
}

/// Ripped artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MkvFile {
    /// Absolute path to the ripped file.
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file, computed right after the rip.
    pub sha256: String,
    /// Resolution label such as `1080p` or `4k`.
    pub resolution: String,
}

/// Result of ingesting into one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum IngestOutcome {
    Ingested { at: DateTime<Utc> },
    Failed { error: String, at: DateTime<Utc> },
}

impl IngestOutcome {
    pub fn is_ingested(&self) -> bool {
        matches!(self, Self::Ingested { .. })
    }
}

/// Persisted lifecycle record for one (disc, title) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub disc_id: String,
    pub title_id: u32,
    pub label: String,
    pub original_name: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub file: Option<MkvFile>,
    /// Outcome per destination, keyed by the destination's display form.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingest: BTreeMap<String, IngestOutcome>,
}

impl Workflow {
    /// Create a workflow in `Start`.
    pub fn new(
        disc_id: impl Into<String>,
        title_id: u32,
        label: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            disc_id: disc_id.into(),
            title_id,
            label: label.into(),
            original_name: original_name.into(),
            status: WorkflowStatus::Start,
            imdb_id: None,
            name: None,
            year: None,
            file: None,
            ingest: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> WorkflowKey {
        WorkflowKey::new(self.disc_id.clone(), self.title_id)
    }

    /// Confirmed name and year, if both are set and non-empty.
    pub fn confirmed_name(&self) -> Option<(&str, &str)> {
        match (self.name.as_deref(), self.year.as_deref()) {
            (Some(name), Some(year)) if !name.is_empty() && !year.is_empty() => Some((name, year)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges() {
        use WorkflowStatus::*;
        assert!(Start.can_advance_to(Ripping));
        assert!(Ripping.can_advance_to(Pending));
        assert!(Ripping.can_advance_to(Error));
        assert!(Pending.can_advance_to(Importing));
        assert!(Importing.can_advance_to(Done));
        assert!(Error.can_advance_to(Ripping));
    }

    #[test]
    fn test_backward_edges_rejected() {
        use WorkflowStatus::*;
        assert!(!Pending.can_advance_to(Ripping));
        assert!(!Done.can_advance_to(Ripping));
        assert!(!Importing.can_advance_to(Pending));
        assert!(!Done.can_advance_to(Start));
        assert!(!Importing.can_advance_to(Error));
        assert!(!Start.can_advance_to(Pending));
    }

    #[test]
    fn test_recovered() {
        assert_eq!(
            WorkflowStatus::Ripping.recovered(),
            Some(WorkflowStatus::Error)
        );
        assert_eq!(
            WorkflowStatus::Importing.recovered(),
            Some(WorkflowStatus::Pending)
        );
        assert_eq!(WorkflowStatus::Pending.recovered(), None);
        assert_eq!(WorkflowStatus::Done.recovered(), None);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            WorkflowStatus::Start,
            WorkflowStatus::Ripping,
            WorkflowStatus::Pending,
            WorkflowStatus::Importing,
            WorkflowStatus::Done,
            WorkflowStatus::Error,
        ] {
            assert_eq!(status.to_string().parse::<WorkflowStatus>(), Ok(status));
        }
        assert!("bogus".parse::<WorkflowStatus>().is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&WorkflowStatus::Importing).unwrap();
        assert_eq!(json, "\"importing\"");
        let json = serde_json::to_string(&DriveStatus::Mkv).unwrap();
        assert_eq!(json, "\"mkv\"");
    }

    #[test]
    fn test_confirmed_name() {
        let mut wf = Workflow::new("d", 0, "LABEL", "Guess");
        assert_eq!(wf.confirmed_name(), None);
        wf.name = Some("Foo".into());
        assert_eq!(wf.confirmed_name(), None);
        wf.year = Some(String::new());
        assert_eq!(wf.confirmed_name(), None);
        wf.year = Some("1999".into());
        assert_eq!(wf.confirmed_name(), Some(("Foo", "1999")));
    }

    #[test]
    fn test_workflow_json_defaults() {
        let wf: Workflow = serde_json::from_str(
            r#"{"disc_id":"d","title_id":1,"label":"L","original_name":"O"}"#,
        )
        .unwrap();
        assert_eq!(wf.status, WorkflowStatus::Start);
        assert!(wf.file.is_none());
        assert!(wf.ingest.is_empty());
    }
}
