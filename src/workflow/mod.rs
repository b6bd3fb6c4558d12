//! Workflow lifecycle: one record per (disc, title) pair, from first sight of
//! the disc through ripping to archiving.
//!
//! The in-memory index is the source of truth while the process runs and is
//! guarded by a single lock. Every mutation is persisted through the
//! configured [`WorkflowStore`] before it becomes visible; a failed persist
//! leaves the index unchanged. Store I/O happens outside the index lock, so
//! readers never wait on a write.

pub mod events;
pub mod store;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use ripvault_common::{
    DiscInfo, Error, IngestOutcome, Result, TitleInfo, Workflow, WorkflowKey, WorkflowStatus,
};
use ripvault_mkv::RipProgress;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::DiscInfoCache;
use crate::drive::{DriveManager, PROGRESS_BUFFER};
use crate::ingest::Ingester;

pub use events::WorkflowEvent;
pub use store::{index_of, JsonWorkflowStore, SqliteWorkflowStore, WorkflowIndex, WorkflowStore};

#[derive(Default)]
struct Inner {
    index: WorkflowIndex,
    /// Keys with an ingest attempt in flight.
    ingesting: HashSet<WorkflowKey>,
}

impl Inner {
    fn get(&self, key: &WorkflowKey) -> Option<&Workflow> {
        self.index.get(&key.disc_id)?.get(&key.title_id)
    }
}

pub struct WorkflowManager {
    inner: Mutex<Inner>,
    /// Serializes persists so stores see writes in index order.
    writes: Mutex<()>,
    store: Box<dyn WorkflowStore>,
    drive: Arc<DriveManager>,
    discs: Arc<dyn DiscInfoCache>,
    ingesters: Vec<Arc<dyn Ingester>>,
    rip_dir: PathBuf,
    events: broadcast::Sender<WorkflowEvent>,
}

/// Removes a key from the in-flight ingest set when dropped.
struct IngestClaim<'a> {
    manager: &'a WorkflowManager,
    key: WorkflowKey,
}

impl Drop for IngestClaim<'_> {
    fn drop(&mut self) {
        self.manager.inner.lock().ingesting.remove(&self.key);
    }
}

impl WorkflowManager {
    /// Load every workflow from `store`.
    ///
    /// Rows are taken as stored. Interrupted workflows are only reset by
    /// [`WorkflowManager::recover`], which the service calls at startup.
    pub fn new(
        store: Box<dyn WorkflowStore>,
        drive: Arc<DriveManager>,
        discs: Arc<dyn DiscInfoCache>,
        ingesters: Vec<Arc<dyn Ingester>>,
        rip_dir: impl Into<PathBuf>,
    ) -> Result<Arc<Self>> {
        let index = index_of(store.load()?);
        let (events, _) = broadcast::channel(events::EVENT_CAPACITY);
        Ok(Arc::new(Self {
            inner: Mutex::new(Inner {
                index,
                ingesting: HashSet::new(),
            }),
            writes: Mutex::new(()),
            store,
            drive,
            discs,
            ingesters,
            rip_dir: rip_dir.into(),
            events,
        }))
    }

    /// Reset workflows interrupted by a previous run of the service.
    ///
    /// A workflow found in `Ripping` died mid-rip and moves to `Error` with
    /// its artifact cleared; one found in `Importing` moves back to
    /// `Pending` so its ingest can be retried. Only the process that owns
    /// the drive may call this, since a live service has rows in exactly
    /// these states. Returns the number of workflows reset.
    pub fn recover(&self) -> Result<usize> {
        let interrupted: Vec<WorkflowKey> = self
            .get_all_workflows()
            .into_iter()
            .filter(|wf| wf.status.recovered().is_some())
            .map(|wf| wf.key())
            .collect();

        for key in &interrupted {
            self.commit_with(|inner| {
                let mut wf = inner
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::not_found(format!("workflow {}", key)))?;
                if let Some(next) = wf.status.recovered() {
                    warn!(
                        disc_id = %wf.disc_id,
                        title_id = wf.title_id,
                        "Workflow was interrupted while {}; resetting to {}",
                        wf.status,
                        next
                    );
                    wf.status = next;
                    if next == WorkflowStatus::Error {
                        wf.file = None;
                    }
                }
                Ok(wf)
            })?;
        }
        Ok(interrupted.len())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn drive(&self) -> &Arc<DriveManager> {
        &self.drive
    }

    pub fn rip_dir(&self) -> &Path {
        &self.rip_dir
    }

    /// Scratch directory of one workflow.
    pub fn workflow_dir(&self, key: &WorkflowKey) -> PathBuf {
        self.rip_dir.join(key.dir_name())
    }

    pub fn get_workflow(&self, disc_id: &str, title_id: u32) -> Option<Workflow> {
        self.inner
            .lock()
            .get(&WorkflowKey::new(disc_id, title_id))
            .cloned()
    }

    pub fn get_workflows(&self, disc_id: &str) -> Vec<Workflow> {
        self.inner
            .lock()
            .index
            .get(disc_id)
            .map(|titles| titles.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_all_workflows(&self) -> Vec<Workflow> {
        self.inner
            .lock()
            .index
            .values()
            .flat_map(|titles| titles.values().cloned())
            .collect()
    }

    /// Get or create the workflow for `(disc_id, title_id)`.
    ///
    /// An existing workflow has its label refreshed in memory. A new one is
    /// returned in `Start` but not recorded until it is saved.
    pub fn new_workflow(
        &self,
        disc_id: &str,
        title_id: u32,
        label: &str,
        guessed_name: &str,
    ) -> (Workflow, bool) {
        let mut inner = self.inner.lock();
        if let Some(wf) = inner
            .index
            .get_mut(disc_id)
            .and_then(|titles| titles.get_mut(&title_id))
        {
            wf.label = label.to_string();
            return (wf.clone(), false);
        }
        (Workflow::new(disc_id, title_id, label, guessed_name), true)
    }

    /// Persist `wf` and make it visible.
    ///
    /// A status change must be a forward edge of the status graph.
    pub fn save(&self, wf: &Workflow) -> Result<()> {
        self.commit_with(|inner| {
            if let Some(current) = inner.get(&wf.key()) {
                if current.status != wf.status && !current.status.can_advance_to(wf.status) {
                    return Err(Error::InvalidTransition {
                        from: current.status,
                        to: wf.status,
                    });
                }
            }
            Ok(wf.clone())
        })?;
        Ok(())
    }

    /// Build the next version of a workflow from the index, persist it,
    /// then publish it.
    ///
    /// `next` runs under the write lock and so sees every earlier commit.
    /// The index lock is released while the store writes.
    fn commit_with<F>(&self, next: F) -> Result<Workflow>
    where
        F: FnOnce(&mut Inner) -> Result<Workflow>,
    {
        let _writes = self.writes.lock();
        let (wf, snapshot) = {
            let mut inner = self.inner.lock();
            let wf = next(&mut inner)?;
            let mut snapshot = inner.index.clone();
            snapshot
                .entry(wf.disc_id.clone())
                .or_default()
                .insert(wf.title_id, wf.clone());
            (wf, snapshot)
        };

        self.store.persist(&wf, &snapshot)?;

        let previous = self
            .inner
            .lock()
            .index
            .entry(wf.disc_id.clone())
            .or_default()
            .insert(wf.title_id, wf.clone());

        if previous.map(|p| p.status) != Some(wf.status) {
            let key = wf.key();
            debug!(disc_id = %key.disc_id, title_id = key.title_id, "Workflow is now {}", wf.status);
            // No subscribers is fine.
            let _ = self.events.send(WorkflowEvent::StatusChanged {
                key,
                status: wf.status,
            });
        }
        Ok(wf)
    }

    /// Apply `f` to the stored copy of `key` and persist the result.
    fn update<F>(&self, key: &WorkflowKey, f: F) -> Result<Workflow>
    where
        F: FnOnce(&mut Workflow),
    {
        self.commit_with(|inner| {
            let mut wf = inner
                .get(key)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("workflow {}", key)))?;
            f(&mut wf);
            Ok(wf)
        })
    }

    /// Record a failed rip and hand the error back.
    fn fail(&self, key: &WorkflowKey, stage: &str, err: Error) -> Error {
        error!(disc_id = %key.disc_id, title_id = key.title_id, stage, "Workflow failed: {}", err);
        if let Err(e) = self.update(key, |wf| wf.status = WorkflowStatus::Error) {
            error!(disc_id = %key.disc_id, title_id = key.title_id, "Could not record failure: {}", e);
        }
        err
    }

    /// Disc info for `disc_id`, scanning the drive on a cache miss.
    pub async fn disc_info(&self, disc_id: &str) -> Result<DiscInfo> {
        if let Some(info) = self.discs.get(disc_id)? {
            return Ok(info);
        }

        match self.drive.disc() {
            None => return Err(Error::NoDevice),
            Some(disc) if disc.uuid != disc_id => {
                return Err(Error::DiscMismatch {
                    expected: disc_id.to_string(),
                    actual: disc.uuid,
                })
            }
            Some(_) => {}
        }

        let info = self.drive.get_disc_info().await?;
        self.discs.save(disc_id, &info)?;
        Ok(info)
    }

    fn check_disc(&self, disc_id: &str) -> Result<()> {
        match self.drive.disc() {
            None => Err(Error::NoDevice),
            Some(disc) if disc.uuid != disc_id => Err(Error::DiscMismatch {
                expected: disc_id.to_string(),
                actual: disc.uuid,
            }),
            Some(_) => Ok(()),
        }
    }

    fn check_startable(status: WorkflowStatus) -> Result<()> {
        if status.is_running() {
            return Err(Error::AlreadyRunning { status });
        }
        match status {
            WorkflowStatus::Pending | WorkflowStatus::Done => Err(Error::InvalidTransition {
                from: status,
                to: WorkflowStatus::Ripping,
            }),
            _ => Ok(()),
        }
    }

    fn check_ingestable(status: WorkflowStatus) -> Result<()> {
        match status {
            // Importing with nothing in flight is a finished, partial attempt.
            WorkflowStatus::Pending | WorkflowStatus::Importing => Ok(()),
            WorkflowStatus::Ripping => Err(Error::AlreadyRunning { status }),
            other => Err(Error::InvalidTransition {
                from: other,
                to: WorkflowStatus::Importing,
            }),
        }
    }

    /// Rip the title of `wf` and, once ripped, ingest it in the background.
    ///
    /// Precondition failures leave the workflow untouched. Once the workflow
    /// is in `Ripping`, any failure moves it to `Error`. Progress updates are
    /// sent to `sink` and broadcast to subscribers.
    pub async fn start(
        self: &Arc<Self>,
        wf: &Workflow,
        sink: Option<mpsc::Sender<RipProgress>>,
    ) -> Result<()> {
        let key = wf.key();
        let current = self
            .get_workflow(&key.disc_id, key.title_id)
            .unwrap_or_else(|| wf.clone());
        Self::check_startable(current.status)?;
        self.check_disc(&key.disc_id)?;

        let info = self.disc_info(&key.disc_id).await?;
        let title: TitleInfo = info
            .title(key.title_id)
            .cloned()
            .ok_or_else(|| Error::TitleNotFound {
                disc_id: key.disc_id.clone(),
                title_id: key.title_id,
            })?;

        // Hold the drive before claiming the workflow so two keys racing for
        // the same drive cannot both reach Ripping.
        let guard = self.drive.reserve_rip()?;
        self.check_disc(&key.disc_id)?;
        self.commit_with(|inner| {
            let mut next = inner.get(&key).cloned().unwrap_or(current);
            Self::check_startable(next.status)?;
            next.status = WorkflowStatus::Ripping;
            next.file = None;
            Ok(next)
        })?;
        info!(disc_id = %key.disc_id, title_id = key.title_id, "Ripping {:?}", title.name);

        let out_dir = self.workflow_dir(&key);
        let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
        let rip = async {
            tokio::fs::create_dir_all(&out_dir).await?;
            self.drive.rip_reserved(guard, &title, &out_dir, Some(tx)).await
        };
        let forward = async {
            while let Some(progress) = rx.recv().await {
                let _ = self.events.send(WorkflowEvent::RipProgress {
                    key: key.clone(),
                    progress: progress.clone(),
                });
                if let Some(sink) = &sink {
                    let _ = sink.send(progress).await;
                }
            }
        };
        let (result, ()) = tokio::join!(rip, forward);

        let mkv = match result {
            Ok(mkv) => mkv,
            Err(e) => return Err(self.fail(&key, "rip", e)),
        };
        let ripped = match self.update(&key, |wf| {
            wf.status = WorkflowStatus::Pending;
            wf.file = Some(mkv);
        }) {
            Ok(wf) => wf,
            Err(e) => return Err(self.fail(&key, "persist", e)),
        };
        info!(disc_id = %key.disc_id, title_id = key.title_id, "Rip finished");

        if ripped.confirmed_name().is_some() {
            self.spawn_ingest(ripped);
        } else {
            info!(
                disc_id = %key.disc_id,
                title_id = key.title_id,
                "Waiting for name and year before ingest"
            );
        }
        Ok(())
    }

    fn spawn_ingest(self: &Arc<Self>, wf: Workflow) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = manager.ingest(&wf).await {
                warn!(
                    disc_id = %wf.disc_id,
                    title_id = wf.title_id,
                    "Ingest did not complete: {}",
                    e
                );
            }
        })
    }

    /// Spawn ingest for every ripped workflow that is ready for it.
    pub fn resume_pending(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        self.get_all_workflows()
            .into_iter()
            .filter(|wf| {
                wf.status == WorkflowStatus::Pending
                    && wf.file.is_some()
                    && wf.confirmed_name().is_some()
            })
            .map(|wf| {
                info!(disc_id = %wf.disc_id, title_id = wf.title_id, "Resuming ingest");
                self.spawn_ingest(wf)
            })
            .collect()
    }

    /// Archive the ripped file of `wf` to every destination.
    ///
    /// Destinations already recorded as ingested are skipped. When all have
    /// succeeded the local copy is cleaned and the workflow is `Done`;
    /// otherwise it stays `Importing` and the first failure is returned.
    pub async fn ingest(&self, wf: &Workflow) -> Result<()> {
        let key = wf.key();
        let _claim = {
            let mut inner = self.inner.lock();
            if inner.ingesting.contains(&key) {
                return Err(Error::AlreadyRunning {
                    status: WorkflowStatus::Importing,
                });
            }
            let current = inner
                .get(&key)
                .ok_or_else(|| Error::not_found(format!("workflow {}", key)))?;
            Self::check_ingestable(current.status)?;
            if current.file.is_none() {
                return Err(Error::precondition("no ripped file"));
            }
            if current.confirmed_name().is_none() {
                return Err(Error::precondition("name and year are not confirmed"));
            }
            if self.ingesters.is_empty() {
                return Err(Error::precondition("no ingest targets configured"));
            }
            inner.ingesting.insert(key.clone());
            IngestClaim {
                manager: self,
                key: key.clone(),
            }
        };

        // The claim keeps other ingests of this key out; a failed persist
        // drops it again.
        let current = self.commit_with(|inner| {
            let mut next = inner
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("workflow {}", key)))?;
            Self::check_ingestable(next.status)?;
            next.status = WorkflowStatus::Importing;
            Ok(next)
        })?;

        let (Some(mkv), Some((name, year))) = (current.file.as_ref(), current.confirmed_name())
        else {
            return Err(Error::internal("ingest preconditions changed"));
        };

        let mut first_error = None;
        for ingester in &self.ingesters {
            let target = ingester.target().to_string();
            if current
                .ingest
                .get(&target)
                .is_some_and(IngestOutcome::is_ingested)
            {
                debug!(disc_id = %key.disc_id, title_id = key.title_id, target = %target, "Already ingested");
                continue;
            }

            info!(disc_id = %key.disc_id, title_id = key.title_id, target = %target, "Ingesting");
            let result = ingester.ingest(mkv, name, year).await;
            let outcome = match &result {
                Ok(()) => IngestOutcome::Ingested { at: Utc::now() },
                Err(e) => {
                    error!(
                        disc_id = %key.disc_id,
                        title_id = key.title_id,
                        target = %target,
                        "Ingest failed: {}",
                        e
                    );
                    IngestOutcome::Failed {
                        error: e.to_string(),
                        at: Utc::now(),
                    }
                }
            };
            self.update(&key, |wf| {
                wf.ingest.insert(target.clone(), outcome);
            })?;
            let _ = self.events.send(WorkflowEvent::IngestFinished {
                key: key.clone(),
                target,
                error: result.as_ref().err().map(ToString::to_string),
            });
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        self.clean(&current).await?;
        self.update(&key, |wf| wf.status = WorkflowStatus::Done)?;
        info!(disc_id = %key.disc_id, title_id = key.title_id, "Workflow done");
        Ok(())
    }

    /// Delete the local ripped file and scratch directory of `wf`.
    pub async fn clean(&self, wf: &Workflow) -> Result<()> {
        let key = wf.key();
        let current = self
            .get_workflow(&key.disc_id, key.title_id)
            .ok_or_else(|| Error::not_found(format!("workflow {}", key)))?;
        if current.status == WorkflowStatus::Ripping {
            return Err(Error::AlreadyRunning {
                status: current.status,
            });
        }

        if let Some(file) = &current.file {
            remove_ignoring_missing(tokio::fs::remove_file(&file.path).await)?;
        }
        remove_ignoring_missing(tokio::fs::remove_dir_all(self.workflow_dir(&key)).await)?;

        self.update(&key, |wf| wf.file = None)?;
        debug!(disc_id = %key.disc_id, title_id = key.title_id, "Cleaned local files");
        Ok(())
    }
}

fn remove_ignoring_missing(result: std::io::Result<()>) -> Result<()> {
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
