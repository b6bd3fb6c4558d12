//! The ripping engine seam and its makemkvcon implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ripvault_common::{DiscInfo, Error, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::command::ToolCommand;
use crate::info::parse_disc_info;
use crate::progress::{ProgressTracker, RipProgress};

/// Titles shorter than this are skipped by makemkvcon (one hour).
pub const DEFAULT_MIN_LENGTH_SECS: u32 = 3600;

const SCAN_TIMEOUT: Duration = Duration::from_secs(600);

/// An external engine that can read a disc's title table and rip one title.
///
/// `device` is the block device path, e.g. `/dev/sr0`.
#[async_trait]
pub trait RipEngine: Send + Sync {
    /// Read the disc's table of contents.
    async fn scan(&self, device: &str) -> Result<DiscInfo>;

    /// Rip `title_id` into `out_dir`, streaming progress into `progress`.
    ///
    /// The sender is consumed and dropped when the rip returns, so the
    /// receiving side always observes the channel closing.
    async fn rip(
        &self,
        device: &str,
        title_id: u32,
        out_dir: &Path,
        progress: mpsc::Sender<RipProgress>,
    ) -> Result<()>;
}

/// makemkvcon in robot mode.
#[derive(Debug, Clone)]
pub struct MakeMkv {
    program: PathBuf,
    min_length_secs: u32,
}

impl MakeMkv {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            min_length_secs: DEFAULT_MIN_LENGTH_SECS,
        }
    }

    pub fn with_min_length(mut self, secs: u32) -> Self {
        self.min_length_secs = secs;
        self
    }

    fn min_length_arg(&self) -> String {
        format!("--minlength={}", self.min_length_secs)
    }

    /// Arguments for a rip of one title.
    pub fn rip_args(&self, device: &str, title_id: u32, out_dir: &Path) -> Vec<String> {
        vec![
            "-r".to_string(),
            "--noscan".to_string(),
            "--progress=-same".to_string(),
            self.min_length_arg(),
            "mkv".to_string(),
            format!("dev:{}", device),
            title_id.to_string(),
            out_dir.to_string_lossy().to_string(),
        ]
    }

    /// Arguments for a table-of-contents scan.
    pub fn scan_args(&self, device: &str) -> Vec<String> {
        vec![
            "-r".to_string(),
            "--noscan".to_string(),
            self.min_length_arg(),
            "info".to_string(),
            format!("dev:{}", device),
        ]
    }
}

#[async_trait]
impl RipEngine for MakeMkv {
    async fn scan(&self, device: &str) -> Result<DiscInfo> {
        tracing::debug!("Scanning disc in {}", device);
        let output = ToolCommand::new(&self.program)
            .args(self.scan_args(device))
            .timeout(SCAN_TIMEOUT)
            .execute()
            .await?;
        parse_disc_info(&output.stdout)
    }

    async fn rip(
        &self,
        device: &str,
        title_id: u32,
        out_dir: &Path,
        progress: mpsc::Sender<RipProgress>,
    ) -> Result<()> {
        let args = self.rip_args(device, title_id, out_dir);
        tracing::info!("Running makemkvcon {}", args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool("makemkvcon", format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::internal("makemkvcon stdout not captured"))?;

        let mut tracker = ProgressTracker::new();
        let mut lines = BufReader::new(stdout).lines();
        let mut listening = true;
        while let Some(line) = lines.next_line().await? {
            if let Some(update) = tracker.feed(&line) {
                // Keep draining stdout after the consumer goes away.
                if listening && progress.send(update).await.is_err() {
                    listening = false;
                }
            }
        }
        drop(progress);

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::tool(
                "makemkvcon",
                format!(
                    "exited with status {}: {}",
                    status,
                    tracker.last_message().unwrap_or("no message")
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rip_args() {
        let mkv = MakeMkv::new("makemkvcon");
        assert_eq!(
            mkv.rip_args("/dev/sr0", 3, Path::new("/rips/x/.rip-3")),
            vec![
                "-r",
                "--noscan",
                "--progress=-same",
                "--minlength=3600",
                "mkv",
                "dev:/dev/sr0",
                "3",
                "/rips/x/.rip-3"
            ]
        );
    }

    #[test]
    fn test_scan_args_min_length() {
        let mkv = MakeMkv::new("makemkvcon").with_min_length(120);
        assert_eq!(
            mkv.scan_args("/dev/sr1"),
            vec!["-r", "--noscan", "--minlength=120", "info", "dev:/dev/sr1"]
        );
    }

    #[tokio::test]
    async fn test_rip_missing_binary_closes_channel() {
        let mkv = MakeMkv::new("nonexistent_makemkvcon_12345");
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let result = mkv.rip("/dev/sr0", 0, dir.path(), tx).await;
        assert!(matches!(result, Err(Error::Tool { .. })));
        assert!(rx.recv().await.is_none());
    }
}
