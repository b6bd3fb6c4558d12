//! One-way migration of the flat JSON stores into SQLite.
//!
//! Each JSON file is renamed to `*.bak` once all of its records are in the
//! database, so a second run finds nothing to do.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ripvault_common::{DiscInfo, Result};
use ripvault_db::pool::{get_conn, DbPool};
use ripvault_db::queries::{disc_info, workflows};
use tracing::info;

use crate::cache::DISCS_JSON;
use crate::jsonfile;
use crate::workflow::store::{WorkflowIndex, WORKFLOWS_JSON};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub discs: usize,
    pub workflows: usize,
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

pub fn migrate_json_to_sqlite(data_dir: &Path, pool: &DbPool) -> Result<MigrationReport> {
    let conn = get_conn(pool)?;
    let mut report = MigrationReport::default();

    let discs_path = data_dir.join(DISCS_JSON);
    if discs_path.exists() {
        let discs: BTreeMap<String, DiscInfo> = jsonfile::read_or_default(&discs_path)?;
        for (uuid, info) in &discs {
            disc_info::upsert_disc_info(&conn, uuid, info)?;
        }
        std::fs::rename(&discs_path, backup_path(&discs_path))?;
        info!("Migrated {} discs from {:?}", discs.len(), discs_path);
        report.discs = discs.len();
    }

    let workflows_path = data_dir.join(WORKFLOWS_JSON);
    if workflows_path.exists() {
        let index: WorkflowIndex = jsonfile::read_or_default(&workflows_path)?;
        for wf in index.values().flat_map(BTreeMap::values) {
            workflows::upsert_workflow(&conn, wf)?;
            report.workflows += 1;
        }
        std::fs::rename(&workflows_path, backup_path(&workflows_path))?;
        info!("Migrated {} workflows from {:?}", report.workflows, workflows_path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DiscInfoCache, JsonDiscCache};
    use crate::workflow::store::{index_of, JsonWorkflowStore, WorkflowStore};
    use ripvault_common::{TitleInfo, Workflow};
    use ripvault_db::pool::init_memory_pool;

    #[test]
    fn test_migrate_and_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDiscCache::open(dir.path().join(DISCS_JSON)).unwrap();
        let info = DiscInfo {
            titles: vec![TitleInfo {
                id: 0,
                ..Default::default()
            }],
            ..Default::default()
        };
        cache.save("disc-1", &info).unwrap();

        let store = JsonWorkflowStore::new(dir.path().join(WORKFLOWS_JSON));
        let a = Workflow::new("disc-1", 0, "L", "A");
        let b = Workflow::new("disc-2", 4, "L", "B");
        store.persist(&b, &index_of([a, b.clone()])).unwrap();

        let pool = init_memory_pool().unwrap();
        let report = migrate_json_to_sqlite(dir.path(), &pool).unwrap();
        assert_eq!(report, MigrationReport { discs: 1, workflows: 2 });

        let conn = get_conn(&pool).unwrap();
        assert_eq!(disc_info::get_disc_info(&conn, "disc-1").unwrap(), Some(info));
        assert_eq!(workflows::list_workflows(&conn).unwrap().len(), 2);
        assert!(dir.path().join("discs.json.bak").exists());
        assert!(dir.path().join("workflows.json.bak").exists());
        assert!(!dir.path().join(WORKFLOWS_JSON).exists());
        drop(conn);

        let again = migrate_json_to_sqlite(dir.path(), &pool).unwrap();
        assert_eq!(again, MigrationReport::default());
    }

    #[test]
    fn test_nothing_to_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_memory_pool().unwrap();
        assert_eq!(
            migrate_json_to_sqlite(dir.path(), &pool).unwrap(),
            MigrationReport::default()
        );
    }
}
