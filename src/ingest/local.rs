use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ripvault_common::checksum::sha256_file;
use ripvault_common::{Error, MkvFile, Result};
use tracing::{debug, info};

use super::{Ingester, Layout, Manifest};
use crate::config::Target;

/// Ingests into a directory on a mounted filesystem.
pub struct LocalIngester {
    target: Target,
    use_movie_dir: bool,
    /// Held from manifest read to manifest write.
    manifest_lock: Arc<Mutex<()>>,
}

impl LocalIngester {
    pub fn new(target: Target, use_movie_dir: bool) -> Self {
        Self {
            target,
            use_movie_dir,
            manifest_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl Ingester for LocalIngester {
    fn target(&self) -> &Target {
        &self.target
    }

    async fn ingest(&self, mkv: &MkvFile, name: &str, year: &str) -> Result<()> {
        let layout = Layout::new(&self.target.path, mkv, name, year, self.use_movie_dir)?;
        let mkv = mkv.clone();
        let manifest_lock = Arc::clone(&self.manifest_lock);
        tokio::task::spawn_blocking(move || ingest_blocking(&mkv, &layout, &manifest_lock))
            .await
            .map_err(|e| Error::internal(format!("ingest task failed: {e}")))?
    }
}

fn ingest_blocking(mkv: &MkvFile, layout: &Layout, manifest_lock: &Mutex<()>) -> Result<()> {
    if let Some(staging) = layout.staged.parent() {
        fs::create_dir_all(staging)?;
    }
    debug!("Staging {:?} as {:?}", mkv.path, layout.staged);
    fs::copy(&mkv.path, &layout.staged)?;

    let actual = sha256_file(&layout.staged)?;
    if actual != mkv.sha256 {
        return Err(Error::ChecksumMismatch {
            expected: mkv.sha256.clone(),
            actual,
        });
    }

    fs::create_dir_all(&layout.dest_dir)?;
    set_mode(&layout.dest_dir, 0o775)?;
    set_mode(&layout.staged, 0o664)?;

    {
        let _manifest = manifest_lock.lock();
        let mut manifest = Manifest::load(&layout.manifest)?;
        manifest.insert(layout.manifest_path.clone(), mkv.sha256.clone());
        manifest.save(&layout.manifest)?;
    }

    fs::rename(&layout.staged, &layout.dest)?;
    info!("Archived {:?}", layout.dest);
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
