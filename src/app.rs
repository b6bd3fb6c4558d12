//! Construction of the long-lived services from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use ripvault_db::pool::{init_pool, DbPool};
use ripvault_mkv::{tool_path_or_name, MakeMkv, RipEngine};

use crate::cache::{DiscInfoCache, JsonDiscCache, SqliteDiscCache, DISCS_JSON};
use crate::config::{Config, StoreKind};
use crate::drive::DriveManager;
use crate::ingest;
use crate::workflow::store::WORKFLOWS_JSON;
use crate::workflow::{JsonWorkflowStore, SqliteWorkflowStore, WorkflowManager, WorkflowStore};

/// Database filename under the data directory.
pub const DB_FILE: &str = "ripvault.db";

pub struct Stores {
    pub workflows: Box<dyn WorkflowStore>,
    pub discs: Arc<dyn DiscInfoCache>,
}

pub fn open_pool(config: &Config) -> Result<DbPool> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;
    let db_path = config.data_dir.join(DB_FILE);
    tracing::info!("Opening database at {:?}", db_path);
    Ok(init_pool(&db_path)?)
}

pub fn open_stores(config: &Config) -> Result<Stores> {
    match config.store {
        StoreKind::Sqlite => {
            let pool = open_pool(config)?;
            Ok(Stores {
                workflows: Box::new(SqliteWorkflowStore::new(pool.clone())),
                discs: Arc::new(SqliteDiscCache::new(pool)),
            })
        }
        StoreKind::Json => Ok(Stores {
            workflows: Box::new(JsonWorkflowStore::new(config.data_dir.join(WORKFLOWS_JSON))),
            discs: Arc::new(JsonDiscCache::open(config.data_dir.join(DISCS_JSON))?),
        }),
    }
}

pub fn rip_engine(config: &Config) -> Arc<dyn RipEngine> {
    let program = tool_path_or_name("makemkvcon", config.tools.makemkvcon.as_deref());
    Arc::new(MakeMkv::new(program).with_min_length(config.drive.min_length_secs))
}

pub fn drive_manager(config: &Config, engine: Arc<dyn RipEngine>) -> Arc<DriveManager> {
    let ffprobe = tool_path_or_name("ffprobe", config.tools.ffprobe.as_deref());
    Arc::new(DriveManager::new(config.drive.device.clone(), engine, ffprobe))
}

/// Workflow manager over the configured stores and destinations.
///
/// Rows are loaded as stored; the service calls
/// [`WorkflowManager::recover`] itself once it owns the drive.
pub fn workflow_manager(config: &Config, drive: Arc<DriveManager>) -> Result<Arc<WorkflowManager>> {
    let stores = open_stores(config)?;
    let ingesters = ingest::from_config(config)?;
    Ok(WorkflowManager::new(
        stores.workflows,
        drive,
        stores.discs,
        ingesters,
        config.rip_dir.clone(),
    )?)
}
