//! # ripvault-mkv
//!
//! External tool integration for ripping optical discs.
//!
//! This crate provides:
//! - Tool discovery for makemkvcon, ffprobe, ssh, scp, and udevadm
//! - An async [`ToolCommand`] builder with timeouts
//! - Parsing of makemkvcon robot output into disc info and progress updates
//! - The [`RipEngine`] trait and its [`MakeMkv`] implementation
//! - ffprobe-based resolution probing
//!
//! ## Example
//!
//! ```no_run
//! use ripvault_mkv::{MakeMkv, RipEngine};
//!
//! # async fn example() -> ripvault_common::Result<()> {
//! let engine = MakeMkv::new("makemkvcon");
//! let info = engine.scan("/dev/sr0").await?;
//! for title in &info.titles {
//!     println!("{}: {} ({})", title.id, title.name, title.duration);
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod info;
pub mod makemkv;
pub mod probe;
pub mod progress;
pub mod robot;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use info::parse_disc_info;
pub use makemkv::{MakeMkv, RipEngine, DEFAULT_MIN_LENGTH_SECS};
pub use probe::probe_resolution;
pub use progress::{ProgressTracker, RipProgress};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, tool_path_or_name, ToolInfo};
