//! Ripvault-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across ripvault:
//!
//! - **Error Handling**: The drive/workflow/ingest error taxonomy and result alias
//! - **Core Types**: Drive and workflow status enums, workflows, ripped artifacts
//! - **Disc Info**: The title table reported by the ripping engine
//! - **Path Utilities**: Archive naming rules
//! - **Checksums**: Streaming SHA-256 helpers
//!
//! # Examples
//!
//! ```
//! use ripvault_common::{Workflow, WorkflowStatus};
//! use ripvault_common::paths::movie_file_name;
//!
//! let wf = Workflow::new("1234-ABCD", 0, "MOVIE_DISC", "Movie");
//! assert_eq!(wf.status, WorkflowStatus::Start);
//! assert_eq!(movie_file_name("Foo", "1999", "1080p"), "Foo (1999) - 1080p.mkv");
//! ```

pub mod checksum;
pub mod disc;
pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use disc::{DiscInfo, StreamInfo, StreamKind, TitleInfo};
pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
