//! Trait definition and types for metadata providers.
//!
//! A provider confirms the human name, release year and catalogue id of a
//! movie from the guessed name of a disc.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A movie as reported by a metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieResult {
    pub title: String,
    /// Four-digit release year.
    pub year: String,
    /// IMDb identifier, e.g. `tt0133093`.
    pub imdb_id: String,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"omdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has credentials and can be queried.
    fn is_available(&self) -> bool;

    /// Candidate movies for a free-text title.
    async fn search(&self, title: &str) -> anyhow::Result<Vec<MovieResult>>;

    /// The single best match for an exact title, if any.
    async fn by_title(&self, title: &str) -> anyhow::Result<Option<MovieResult>>;

    /// Lookup by IMDb identifier.
    async fn by_imdb_id(&self, imdb_id: &str) -> anyhow::Result<Option<MovieResult>>;
}

/// Drop subtitles and annotations: everything from the first `[`, `{`, `(`
/// or `:` onwards.
pub fn truncate_title(name: &str) -> &str {
    name.find(['[', '{', '(', ':'])
        .map(|idx| name[..idx].trim_end())
        .unwrap_or(name)
}

/// Look `name` up by title, retrying once with [`truncate_title`] when the
/// full name finds nothing or fails.
pub async fn find_movie(
    provider: &dyn MetadataProvider,
    name: &str,
) -> anyhow::Result<Option<MovieResult>> {
    let first = provider.by_title(name).await;
    if let Ok(Some(movie)) = first {
        return Ok(Some(movie));
    }

    let short = truncate_title(name);
    if short.is_empty() || short == name {
        return first;
    }
    if let Err(e) = &first {
        tracing::debug!("Lookup of {:?} failed ({}), retrying as {:?}", name, e, short);
    }
    provider.by_title(short).await
}
