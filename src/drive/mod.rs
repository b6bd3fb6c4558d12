//! The single physical drive.
//!
//! [`DriveManager`] owns the drive status and the identity of the mounted
//! disc. Presence changes come from a [`device::DeviceEventSource`]; scans
//! and rips are the two busy operations, and at most one of them runs at a
//! time. A second attempt fails with [`Error::DriveBusy`] instead of waiting.

pub mod device;
pub mod udev;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ripvault_common::checksum::sha256_file;
use ripvault_common::paths::resolution_label;
use ripvault_common::{Disc, DiscInfo, DriveStatus, Error, MkvFile, Result, TitleInfo};
use ripvault_mkv::{probe_resolution, RipEngine, RipProgress};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use device::DeviceEvent;

/// Capacity of the engine-to-manager progress channel.
pub const PROGRESS_BUFFER: usize = 64;

/// Called once for each newly mounted disc.
#[async_trait]
pub trait DiscHandler: Send + Sync {
    async fn handle_disc(&self, disc: Disc);
}

#[derive(Debug, Default)]
struct DriveState {
    status: DriveStatus,
    disc: Option<Disc>,
    busy: bool,
    progress: Option<RipProgress>,
}

pub struct DriveManager {
    device: String,
    engine: Arc<dyn RipEngine>,
    ffprobe: PathBuf,
    state: Mutex<DriveState>,
}

/// Holds the drive in `Reading` or `Mkv` until dropped.
#[must_use = "the drive is released when the guard is dropped"]
pub struct DriveGuard<'a> {
    drive: &'a DriveManager,
}

impl std::fmt::Debug for DriveGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveGuard").finish_non_exhaustive()
    }
}

impl Drop for DriveGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.drive.state.lock();
        state.busy = false;
        state.status = if state.disc.is_some() {
            DriveStatus::Ready
        } else {
            DriveStatus::Empty
        };
    }
}

impl DriveManager {
    pub fn new(device: impl Into<String>, engine: Arc<dyn RipEngine>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            engine,
            ffprobe: ffprobe.into(),
            state: Mutex::new(DriveState::default()),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn status(&self) -> DriveStatus {
        self.state.lock().status
    }

    /// The mounted disc, if any.
    pub fn disc(&self) -> Option<Disc> {
        self.state.lock().disc.clone()
    }

    /// Last progress update of the current or most recent rip.
    pub fn progress(&self) -> Option<RipProgress> {
        self.state.lock().progress.clone()
    }

    /// Apply a presence change. Returns the disc whenever the medium is
    /// present, so a repeated event gives the new-disc handler another pass.
    pub fn handle_device_event(&self, event: &DeviceEvent) -> Option<Disc> {
        if event.device != self.device {
            debug!("Ignoring event for {}", event.device);
            return None;
        }

        let mut state = self.state.lock();
        match &event.media {
            None => {
                if state.disc.take().is_some() {
                    info!(device = %self.device, "Disc removed");
                }
                state.status = DriveStatus::Empty;
                None
            }
            Some(disc) => {
                let changed = state.disc.as_ref() != Some(disc);
                state.disc = Some(disc.clone());
                if !state.busy {
                    state.status = DriveStatus::Ready;
                }
                if changed {
                    info!(device = %self.device, uuid = %disc.uuid, label = %disc.label, "Disc inserted");
                } else {
                    debug!(device = %self.device, uuid = %disc.uuid, "Disc still present");
                }
                Some(disc.clone())
            }
        }
    }

    /// Consume device events until the source closes.
    ///
    /// Each newly mounted disc is passed to `handler` on its own task.
    pub fn listen(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<DeviceEvent>,
        handler: Arc<dyn DiscHandler>,
    ) -> JoinHandle<()> {
        let drive = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Some(disc) = drive.handle_device_event(&event) {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move { handler.handle_disc(disc).await });
                }
            }
            debug!("Device event stream closed");
        })
    }

    fn reserve(&self, next: DriveStatus) -> Result<DriveGuard<'_>> {
        let mut state = self.state.lock();
        if next == DriveStatus::Mkv && state.disc.is_none() {
            return Err(Error::NoDevice);
        }
        if state.busy || state.status != DriveStatus::Ready {
            return Err(Error::DriveBusy);
        }
        state.busy = true;
        state.status = next;
        Ok(DriveGuard { drive: self })
    }

    /// Reserve the drive for a scan.
    pub fn reserve_scan(&self) -> Result<DriveGuard<'_>> {
        self.reserve(DriveStatus::Reading)
    }

    /// Reserve the drive for a rip.
    pub fn reserve_rip(&self) -> Result<DriveGuard<'_>> {
        let guard = self.reserve(DriveStatus::Mkv)?;
        self.state.lock().progress = None;
        Ok(guard)
    }

    /// Read the table of contents of the mounted disc.
    pub async fn get_disc_info(&self) -> Result<DiscInfo> {
        let _guard = self.reserve_scan()?;
        info!(device = %self.device, "Scanning disc");
        self.engine.scan(&self.device).await
    }

    /// Rip `title` into `out_dir`.
    pub async fn rip_file(
        &self,
        title: &TitleInfo,
        out_dir: &Path,
        sink: Option<mpsc::Sender<RipProgress>>,
    ) -> Result<MkvFile> {
        let guard = self.reserve_rip()?;
        self.rip_reserved(guard, title, out_dir, sink).await
    }

    /// Rip with a drive already reserved through [`reserve_rip`](Self::reserve_rip).
    ///
    /// The engine writes into `out_dir/.rip-<title>`; the single file it
    /// produces is hashed, moved into `out_dir` and probed.
    pub async fn rip_reserved(
        &self,
        guard: DriveGuard<'_>,
        title: &TitleInfo,
        out_dir: &Path,
        sink: Option<mpsc::Sender<RipProgress>>,
    ) -> Result<MkvFile> {
        let scratch = out_dir.join(format!(".rip-{}", title.id));
        match tokio::fs::remove_dir_all(&scratch).await {
            Ok(()) => warn!("Removed stale scratch directory {:?}", scratch),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&scratch).await?;

        info!(device = %self.device, title = title.id, "Ripping into {:?}", out_dir);
        let result = self.rip_into(&scratch, title, out_dir, sink).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {:?}: {}", scratch, e);
            }
        }
        drop(guard);
        result
    }

    async fn rip_into(
        &self,
        scratch: &Path,
        title: &TitleInfo,
        out_dir: &Path,
        sink: Option<mpsc::Sender<RipProgress>>,
    ) -> Result<MkvFile> {
        let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
        let rip = self.engine.rip(&self.device, title.id, scratch, tx);
        let forward = async {
            while let Some(progress) = rx.recv().await {
                self.state.lock().progress = Some(progress.clone());
                if let Some(sink) = &sink {
                    // Observers may go away mid-rip.
                    let _ = sink.send(progress).await;
                }
            }
        };
        let (result, ()) = tokio::join!(rip, forward);
        result?;

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        if files.len() != 1 {
            return Err(Error::AmbiguousOutput(files.len()));
        }
        let ripped = files.remove(0);

        let hashed = ripped.clone();
        let sha256 = tokio::task::spawn_blocking(move || sha256_file(&hashed))
            .await
            .map_err(|e| Error::internal(format!("checksum task failed: {e}")))??;

        let file_name = ripped
            .file_name()
            .ok_or_else(|| Error::internal("ripped file has no name"))?;
        let dest = out_dir.join(file_name);
        tokio::fs::rename(&ripped, &dest).await?;
        let path = tokio::fs::canonicalize(&dest).await?;

        let resolution = match probe_resolution(&self.ffprobe, &path).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!("Probing {:?} failed, using disc info: {}", path, e);
                title.resolution().unwrap_or_else(|| resolution_label(0))
            }
        };

        info!(title = title.id, sha256 = %sha256, resolution = %resolution, "Ripped {:?}", path);
        Ok(MkvFile {
            path,
            sha256,
            resolution,
        })
    }
}
