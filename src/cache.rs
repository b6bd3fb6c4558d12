//! Disc info cache: disc UUID to table of contents.
//!
//! A disc's contents never change, so entries are written once and never
//! invalidated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use ripvault_common::{DiscInfo, Result};
use ripvault_db::pool::{get_conn, DbPool};
use ripvault_db::queries::disc_info;

use crate::jsonfile;

/// Filename of the flat-file cache under the data directory.
pub const DISCS_JSON: &str = "discs.json";

pub trait DiscInfoCache: Send + Sync {
    fn get(&self, uuid: &str) -> Result<Option<DiscInfo>>;
    fn save(&self, uuid: &str, info: &DiscInfo) -> Result<()>;
}

/// Cache kept in memory and written wholesale to a JSON document.
pub struct JsonDiscCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, DiscInfo>>,
}

impl JsonDiscCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = jsonfile::read_or_default(&path)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }
}

impl DiscInfoCache for JsonDiscCache {
    fn get(&self, uuid: &str) -> Result<Option<DiscInfo>> {
        Ok(self.entries.read().get(uuid).cloned())
    }

    fn save(&self, uuid: &str, info: &DiscInfo) -> Result<()> {
        let mut entries = self.entries.write();
        entries.insert(uuid.to_string(), info.clone());
        jsonfile::write_atomic(&self.path, &*entries)
    }
}

/// Cache backed by the `disc_info` table.
pub struct SqliteDiscCache {
    pool: DbPool,
}

impl SqliteDiscCache {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DiscInfoCache for SqliteDiscCache {
    fn get(&self, uuid: &str) -> Result<Option<DiscInfo>> {
        let conn = get_conn(&self.pool)?;
        disc_info::get_disc_info(&conn, uuid)
    }

    fn save(&self, uuid: &str, info: &DiscInfo) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        disc_info::upsert_disc_info(&conn, uuid, info)
    }
}
