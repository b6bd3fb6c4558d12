//! Archive destinations.
//!
//! Every [`Ingester`] runs the same sequence against its destination root:
//! stage a copy under `.input`, verify its digest, create the final
//! directory, record the digest in `Movies.sha256`, and rename the staged
//! copy into `Movies/`. Everything before the rename can be repeated safely.

pub mod local;
pub mod manifest;
pub mod remote;
pub mod ssh;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ripvault_common::paths::{movie_relative_path, MANIFEST_FILE, MOVIES_DIR, STAGING_DIR};
use ripvault_common::{Error, MkvFile, Result};

use crate::config::{Config, Target};

pub use local::LocalIngester;
pub use manifest::Manifest;
pub use ssh::SshIngester;

#[async_trait]
pub trait Ingester: Send + Sync {
    /// The destination this ingester writes to.
    fn target(&self) -> &Target;

    /// Archive `mkv` as `name (year)`.
    async fn ingest(&self, mkv: &MkvFile, name: &str, year: &str) -> Result<()>;
}

/// Settings shared by every ingester.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub use_movie_dir: bool,
    pub ssh: PathBuf,
    pub scp: PathBuf,
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            use_movie_dir: true,
            ssh: PathBuf::from("ssh"),
            scp: PathBuf::from("scp"),
            command_timeout: Duration::from_secs(300),
            transfer_timeout: Duration::from_secs(12 * 60 * 60),
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            use_movie_dir: config.use_movie_dir,
            ssh: ripvault_mkv::tool_path_or_name("ssh", config.tools.ssh.as_deref()),
            scp: ripvault_mkv::tool_path_or_name("scp", config.tools.scp.as_deref()),
            command_timeout: Duration::from_secs(config.ingest.command_timeout_secs),
            transfer_timeout: Duration::from_secs(config.ingest.transfer_timeout_secs),
        }
    }
}

/// Select the ingester for a destination by its scheme.
pub fn for_target(target: &Target, options: &IngestOptions) -> Result<Arc<dyn Ingester>> {
    if target.is_local() {
        return Ok(Arc::new(LocalIngester::new(target.clone(), options.use_movie_dir)));
    }
    match target.scheme.as_str() {
        "ssh" => Ok(Arc::new(SshIngester::new(target.clone(), options)?)),
        other => Err(Error::precondition(format!(
            "unsupported target scheme '{}'",
            other
        ))),
    }
}

/// Ingesters for every configured destination, in configuration order.
pub fn from_config(config: &Config) -> Result<Vec<Arc<dyn Ingester>>> {
    let options = IngestOptions::from_config(config);
    config
        .targets
        .iter()
        .map(|t| for_target(t, &options))
        .collect()
}

/// Where one artifact lands under a destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Staged copy, `<root>/.input/<digest>.mkv`.
    pub staged: PathBuf,
    /// Final file under `<root>/Movies`.
    pub dest: PathBuf,
    /// Directory holding `dest`.
    pub dest_dir: PathBuf,
    /// `<root>/Movies.sha256`.
    pub manifest: PathBuf,
    /// Manifest key: `dest` relative to `<root>/Movies`, `/`-separated.
    pub manifest_path: String,
}

impl Layout {
    pub fn new(root: &Path, mkv: &MkvFile, name: &str, year: &str, use_movie_dir: bool) -> Result<Self> {
        if name.is_empty() || year.is_empty() {
            return Err(Error::precondition("name and year are required"));
        }
        let relative = movie_relative_path(name, year, &mkv.resolution, use_movie_dir);
        let dest = root.join(MOVIES_DIR).join(&relative);
        let dest_dir = dest
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::internal("destination has no parent"))?;
        let manifest_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(Self {
            staged: root.join(STAGING_DIR).join(format!("{}.mkv", mkv.sha256)),
            dest,
            dest_dir,
            manifest: root.join(MANIFEST_FILE),
            manifest_path,
        })
    }
}
