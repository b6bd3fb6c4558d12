//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`DriveManager`] around a
//! [`FakeRipEngine`], a [`WorkflowManager`] over a SQLite database in a
//! temporary directory, and a local archive destination. Nothing here
//! touches a real drive or external tool.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ripvault::cache::SqliteDiscCache;
use ripvault::config::Target;
use ripvault::drive::device::DeviceEvent;
use ripvault::drive::DriveManager;
use ripvault::ingest::{Ingester, LocalIngester};
use ripvault::workflow::{SqliteWorkflowStore, WorkflowManager};
use ripvault_common::{DiscInfo, Result, StreamInfo, StreamKind, TitleInfo, Workflow, WorkflowStatus};
use ripvault_db::pool::{init_pool, DbPool};
use ripvault_mkv::{RipEngine, RipProgress};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const DEVICE: &str = "/dev/sr0";
pub const DISC_ID: &str = "2011-09-27-11-43-58-00";
pub const LABEL: &str = "FOO_DISC";

/// Bytes every fake rip writes.
pub const PAYLOAD: &[u8] = b"not really a matroska file";

/// Two titles: 0 is the 1080p feature, 1 is a short extra.
pub fn disc_info() -> DiscInfo {
    DiscInfo {
        name: "Foo".to_string(),
        volume_name: LABEL.to_string(),
        titles: vec![
            TitleInfo {
                id: 0,
                name: "Foo".to_string(),
                source_file_name: "00800.mpls".to_string(),
                file_name: "Foo_t00.mkv".to_string(),
                duration: "1:52:10".to_string(),
                chapter_count: 24,
                disk_size: "31.2 GB".to_string(),
                streams: vec![StreamInfo {
                    kind: StreamKind::Video,
                    codec: "Mpeg4".to_string(),
                    video_size: Some("1920x1080".to_string()),
                    language: None,
                }],
            },
            TitleInfo {
                id: 1,
                name: "Foo".to_string(),
                source_file_name: "00801.mpls".to_string(),
                file_name: "Foo_t01.mkv".to_string(),
                duration: "0:12:03".to_string(),
                chapter_count: 2,
                disk_size: "2.1 GB".to_string(),
                streams: vec![StreamInfo {
                    kind: StreamKind::Video,
                    codec: "Mpeg2".to_string(),
                    video_size: Some("720x480".to_string()),
                    language: None,
                }],
            },
        ],
    }
}

/// Scripted stand-in for makemkvcon.
pub struct FakeRipEngine {
    info: DiscInfo,
    output_files: usize,
    step: Duration,
    pub scans: AtomicUsize,
    pub rips: AtomicUsize,
}

impl FakeRipEngine {
    pub fn new(info: DiscInfo) -> Self {
        Self {
            info,
            output_files: 1,
            step: Duration::from_millis(5),
            scans: AtomicUsize::new(0),
            rips: AtomicUsize::new(0),
        }
    }

    /// Make every rip leave `n` files behind.
    pub fn with_output_files(mut self, n: usize) -> Self {
        self.output_files = n;
        self
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn rip_count(&self) -> usize {
        self.rips.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RipEngine for FakeRipEngine {
    async fn scan(&self, _device: &str) -> Result<DiscInfo> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.step).await;
        Ok(self.info.clone())
    }

    async fn rip(
        &self,
        _device: &str,
        title_id: u32,
        out_dir: &Path,
        progress: mpsc::Sender<RipProgress>,
    ) -> Result<()> {
        self.rips.fetch_add(1, Ordering::SeqCst);
        for total in [0, 32768, 65536] {
            let _ = progress
                .send(RipProgress {
                    title: "Saving to MKV file".to_string(),
                    channel: "Analyzing seamless segments".to_string(),
                    current: total,
                    total,
                    max: 65536,
                })
                .await;
            tokio::time::sleep(self.step).await;
        }
        for n in 0..self.output_files {
            let name = format!("title_t{:02}_{}.mkv", title_id, n);
            tokio::fs::write(out_dir.join(name), PAYLOAD).await?;
        }
        Ok(())
    }
}

/// Build a workflow manager over `db` with a local ingester per target.
pub fn workflow_manager(
    db: &DbPool,
    drive: Arc<DriveManager>,
    rip_dir: &Path,
    targets: &[PathBuf],
) -> Arc<WorkflowManager> {
    let ingesters: Vec<Arc<dyn Ingester>> = targets
        .iter()
        .map(|path| Arc::new(LocalIngester::new(Target::local(path), true)) as Arc<dyn Ingester>)
        .collect();
    WorkflowManager::new(
        Box::new(SqliteWorkflowStore::new(db.clone())),
        drive,
        Arc::new(SqliteDiscCache::new(db.clone())),
        ingesters,
        rip_dir,
    )
    .expect("failed to create workflow manager")
}

/// Test harness with one drive, one database and local archive targets.
pub struct TestHarness {
    pub dir: TempDir,
    pub db: DbPool,
    pub engine: Arc<FakeRipEngine>,
    pub drive: Arc<DriveManager>,
    pub workflows: Arc<WorkflowManager>,
    pub targets: Vec<PathBuf>,
}

impl TestHarness {
    /// One archive target, one-file rips.
    pub fn new() -> Self {
        Self::with_engine(FakeRipEngine::new(disc_info()))
    }

    pub fn with_engine(engine: FakeRipEngine) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let targets = vec![dir.path().join("archive")];
        Self::build(dir, engine, targets)
    }

    /// Archive to each of `names` under the harness directory.
    pub fn with_targets(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let targets = names.iter().map(|n| dir.path().join(n)).collect();
        Self::build(dir, FakeRipEngine::new(disc_info()), targets)
    }

    fn build(dir: TempDir, engine: FakeRipEngine, targets: Vec<PathBuf>) -> Self {
        for target in &targets {
            std::fs::create_dir_all(target).expect("failed to create target");
        }
        let db = init_pool(dir.path().join("ripvault.db")).expect("failed to open database");
        let engine = Arc::new(engine);
        let drive = Arc::new(DriveManager::new(
            DEVICE,
            Arc::clone(&engine) as Arc<dyn RipEngine>,
            dir.path().join("no-ffprobe"),
        ));
        let rip_dir = dir.path().join("rips");
        let workflows = workflow_manager(&db, Arc::clone(&drive), &rip_dir, &targets);
        Self {
            dir,
            db,
            engine,
            drive,
            workflows,
            targets,
        }
    }

    pub fn rip_dir(&self) -> PathBuf {
        self.dir.path().join("rips")
    }

    pub fn archive(&self) -> &Path {
        &self.targets[0]
    }

    /// Simulate the udev insert of the test disc.
    pub fn insert_disc(&self) {
        self.drive
            .handle_device_event(&DeviceEvent::inserted(DEVICE, DISC_ID, LABEL));
    }

    /// A fresh manager over the same database, as after a process restart.
    pub fn restart(&self) -> Arc<WorkflowManager> {
        let drive = Arc::new(DriveManager::new(
            DEVICE,
            Arc::clone(&self.engine) as Arc<dyn RipEngine>,
            self.dir.path().join("no-ffprobe"),
        ));
        let workflows = workflow_manager(&self.db, drive, &self.rip_dir(), &self.targets);
        workflows.recover().expect("failed to recover workflows");
        workflows
    }

    /// Create and save the workflow for `title_id` of the test disc.
    pub fn create_workflow(&self, title_id: u32) -> Workflow {
        let (wf, _) = self
            .workflows
            .new_workflow(DISC_ID, title_id, LABEL, "Foo");
        self.workflows.save(&wf).expect("failed to save workflow");
        wf
    }

    /// Like [`create_workflow`](Self::create_workflow), already named.
    pub fn create_confirmed(&self, title_id: u32, name: &str, year: &str) -> Workflow {
        let (mut wf, _) = self
            .workflows
            .new_workflow(DISC_ID, title_id, LABEL, "Foo");
        wf.name = Some(name.to_string());
        wf.year = Some(year.to_string());
        self.workflows.save(&wf).expect("failed to save workflow");
        wf
    }

    pub fn workflow(&self, title_id: u32) -> Workflow {
        self.workflows
            .get_workflow(DISC_ID, title_id)
            .expect("workflow not found")
    }
}

/// Poll until the workflow reaches `status`.
pub async fn wait_for_status(
    workflows: &WorkflowManager,
    disc_id: &str,
    title_id: u32,
    status: WorkflowStatus,
) -> Workflow {
    let poll = async {
        loop {
            if let Some(wf) = workflows.get_workflow(disc_id, title_id) {
                if wf.status == status {
                    return wf;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), poll)
        .await
        .unwrap_or_else(|_| panic!("workflow {}/{} never reached {}", disc_id, title_id, status))
}

/// Every file under `root`, relative to it, skipping the staging area.
pub fn tree(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().is_some_and(|n| n == ".input") {
                continue;
            }
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
            if path.is_dir() {
                walk(root, &path, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
