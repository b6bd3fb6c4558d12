//! Durable workflow storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ripvault_common::{Result, Workflow};
use ripvault_db::pool::{get_conn, DbPool};
use ripvault_db::queries::workflows;

use crate::jsonfile;

/// Filename of the flat-file store under the data directory.
pub const WORKFLOWS_JSON: &str = "workflows.json";

/// Disc id to title id to workflow.
pub type WorkflowIndex = BTreeMap<String, BTreeMap<u32, Workflow>>;

pub fn index_of(workflows: impl IntoIterator<Item = Workflow>) -> WorkflowIndex {
    let mut index = WorkflowIndex::new();
    for wf in workflows {
        index
            .entry(wf.disc_id.clone())
            .or_default()
            .insert(wf.title_id, wf);
    }
    index
}

pub trait WorkflowStore: Send + Sync {
    fn load(&self) -> Result<Vec<Workflow>>;

    /// Persist `workflow`. `index` is the full set with `workflow` applied.
    fn persist(&self, workflow: &Workflow, index: &WorkflowIndex) -> Result<()>;
}

/// Whole-index JSON document, rewritten on every save.
pub struct JsonWorkflowStore {
    path: PathBuf,
}

impl JsonWorkflowStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkflowStore for JsonWorkflowStore {
    fn load(&self) -> Result<Vec<Workflow>> {
        let index: WorkflowIndex = jsonfile::read_or_default(&self.path)?;
        Ok(index.into_values().flat_map(BTreeMap::into_values).collect())
    }

    fn persist(&self, _workflow: &Workflow, index: &WorkflowIndex) -> Result<()> {
        jsonfile::write_atomic(&self.path, index)
    }
}

/// One row per workflow in the `workflows` table.
pub struct SqliteWorkflowStore {
    pool: DbPool,
}

impl SqliteWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl WorkflowStore for SqliteWorkflowStore {
    fn load(&self) -> Result<Vec<Workflow>> {
        let conn = get_conn(&self.pool)?;
        workflows::list_workflows(&conn)
    }

    fn persist(&self, workflow: &Workflow, _index: &WorkflowIndex) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        workflows::upsert_workflow(&conn, workflow)
    }
}
