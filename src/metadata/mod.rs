//! Movie metadata lookup.
//!
//! - [`provider`] -- Trait definition, shared types and the title fallback.
//! - [`providers`] -- Concrete provider implementations (OMDb).

pub mod provider;
pub mod providers;

use std::sync::Arc;

pub use provider::{find_movie, truncate_title, MetadataProvider, MovieResult};
pub use providers::OmdbProvider;

use crate::config::OmdbConfig;

/// The configured provider, or `None` when no API key is set.
pub fn from_config(config: &OmdbConfig) -> anyhow::Result<Option<Arc<dyn MetadataProvider>>> {
    if config.api_key.is_empty() {
        return Ok(None);
    }
    let provider = OmdbProvider::new(config.api_key.clone(), config.base_url.clone())?;
    Ok(Some(Arc::new(provider)))
}
