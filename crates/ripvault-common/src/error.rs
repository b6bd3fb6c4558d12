//! Common error types used throughout ripvault.
//!
//! The first group of variants is the drive/workflow/ingest taxonomy that
//! callers match on. The rest wrap failures from storage, external tools,
//! and the filesystem.

use crate::types::WorkflowStatus;

/// Common error type for ripvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The drive is already scanning or ripping.
    #[error("Drive is busy")]
    DriveBusy,

    /// No medium is present in the drive.
    #[error("No disc in drive")]
    NoDevice,

    /// The drive holds a different disc than the one the workflow belongs to.
    #[error("Disc mismatch: expected {expected}, drive has {actual}")]
    DiscMismatch { expected: String, actual: String },

    /// The disc does not expose the requested title.
    #[error("Title {title_id} not found on disc {disc_id}")]
    TitleNotFound { disc_id: String, title_id: u32 },

    /// The workflow already has a rip or ingest in flight.
    #[error("Workflow already running ({status})")]
    AlreadyRunning { status: WorkflowStatus },

    /// A staged copy does not hash to the recorded digest.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// A required field (name, year, artifact) is missing.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The requested status change is not an edge of the workflow graph.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    /// A rip produced zero or several output files.
    #[error("Rip produced {0} output files, expected exactly one")]
    AmbiguousOutput(usize),

    /// The requested item was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external tool failed, timed out, or could not be spawned.
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },

    /// Tool output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The metadata service failed or returned nothing usable.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new PreconditionFailed error.
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    /// Create a new Tool error.
    pub fn tool<T: Into<String>, M: Into<String>>(tool: T, message: M) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new Metadata error.
    pub fn metadata<S: Into<String>>(msg: S) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
