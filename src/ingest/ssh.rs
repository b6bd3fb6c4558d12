use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ripvault_common::{Error, MkvFile, Result};
use ripvault_mkv::ToolCommand;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::remote::RemoteCommand;
use super::{IngestOptions, Ingester, Layout, Manifest};
use crate::config::Target;

/// Ingests into a directory on a host reached over ssh and scp.
///
/// The artifact is copied with scp to `<root>/.input/<digest>.mkv`; every
/// other step runs as a quoted command through ssh.
pub struct SshIngester {
    target: Target,
    host: String,
    use_movie_dir: bool,
    ssh: PathBuf,
    scp: PathBuf,
    command_timeout: Duration,
    transfer_timeout: Duration,
    /// Held from manifest read to manifest write.
    manifest_lock: Mutex<()>,
}

impl SshIngester {
    pub fn new(target: Target, options: &IngestOptions) -> Result<Self> {
        let host = target
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::precondition(format!("ssh target {} has no host", target)))?;
        Ok(Self {
            target,
            host,
            use_movie_dir: options.use_movie_dir,
            ssh: options.ssh.clone(),
            scp: options.scp.clone(),
            command_timeout: options.command_timeout,
            transfer_timeout: options.transfer_timeout,
            manifest_lock: Mutex::new(()),
        })
    }

    pub fn ssh_args(&self, command: &RemoteCommand) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "--".to_string(),
            self.host.clone(),
            command.render(),
        ]
    }

    pub fn scp_args(&self, src: &Path, dst: &Path) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-B".to_string(),
            src.to_string_lossy().into_owned(),
            format!("{}:{}", self.host, dst.to_string_lossy()),
        ]
    }

    async fn run(&self, command: RemoteCommand) -> Result<String> {
        debug!(host = %self.host, "ssh {}", command);
        let output = ToolCommand::new(&self.ssh)
            .args(self.ssh_args(&command))
            .timeout(self.command_timeout)
            .execute()
            .await?;
        Ok(output.stdout)
    }

    async fn run_with_input(&self, command: RemoteCommand, input: Vec<u8>) -> Result<()> {
        debug!(host = %self.host, "ssh {} (with input)", command);
        ToolCommand::new(&self.ssh)
            .args(self.ssh_args(&command))
            .stdin(input)
            .timeout(self.command_timeout)
            .execute()
            .await?;
        Ok(())
    }

    async fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        debug!(host = %self.host, "scp {:?} -> {:?}", src, dst);
        ToolCommand::new(&self.scp)
            .args(self.scp_args(src, dst))
            .timeout(self.transfer_timeout)
            .execute()
            .await?;
        Ok(())
    }

    async fn update_manifest(&self, layout: &Layout, digest: &str) -> Result<()> {
        let _manifest = self.manifest_lock.lock().await;
        self.run(RemoteCommand::new("touch").path_arg(&layout.manifest))
            .await?;
        let text = self
            .run(RemoteCommand::new("cat").path_arg(&layout.manifest))
            .await?;
        let mut manifest = Manifest::parse(&text)?;
        manifest.insert(layout.manifest_path.clone(), digest);

        let tmp = layout.manifest.with_extension("sha256.tmp");
        self.run_with_input(
            RemoteCommand::new("tee").path_arg(&tmp),
            manifest.render().into_bytes(),
        )
        .await?;
        self.run(
            RemoteCommand::new("mv")
                .arg("-f")
                .path_arg(&tmp)
                .path_arg(&layout.manifest),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Ingester for SshIngester {
    fn target(&self) -> &Target {
        &self.target
    }

    async fn ingest(&self, mkv: &MkvFile, name: &str, year: &str) -> Result<()> {
        let layout = Layout::new(&self.target.path, mkv, name, year, self.use_movie_dir)?;
        let staging = layout
            .staged
            .parent()
            .ok_or_else(|| Error::internal("staging path has no parent"))?;

        self.run(RemoteCommand::new("mkdir").arg("-p").path_arg(staging))
            .await?;
        self.copy(&mkv.path, &layout.staged).await?;

        let output = self
            .run(RemoteCommand::new("sha256sum").path_arg(&layout.staged))
            .await?;
        let actual = output.split_whitespace().next().unwrap_or_default();
        if actual != mkv.sha256 {
            return Err(Error::ChecksumMismatch {
                expected: mkv.sha256.clone(),
                actual: actual.to_string(),
            });
        }

        self.run(RemoteCommand::new("mkdir").arg("-p").path_arg(&layout.dest_dir))
            .await?;
        self.run(RemoteCommand::new("chmod").arg("775").path_arg(&layout.dest_dir))
            .await?;
        self.run(RemoteCommand::new("chmod").arg("664").path_arg(&layout.staged))
            .await?;

        self.update_manifest(&layout, &mkv.sha256).await?;

        self.run(
            RemoteCommand::new("mv")
                .arg("-f")
                .path_arg(&layout.staged)
                .path_arg(&layout.dest),
        )
        .await?;
        info!(host = %self.host, "Archived {:?}", layout.dest);
        Ok(())
    }
}
