//! Handling of newly mounted discs.
//!
//! The processor reads the disc's title table, picks the main feature,
//! creates its workflow, fills in metadata when a provider is configured,
//! and optionally starts ripping right away.

use std::sync::Arc;

use async_trait::async_trait;
use ripvault_common::{Disc, Result, Workflow, WorkflowStatus};
use tracing::{error, info, warn};

use crate::drive::DiscHandler;
use crate::metadata::{find_movie, MetadataProvider};
use crate::workflow::WorkflowManager;

pub struct DiscProcessor {
    workflows: Arc<WorkflowManager>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    auto_rip: bool,
}

impl DiscProcessor {
    pub fn new(
        workflows: Arc<WorkflowManager>,
        metadata: Option<Arc<dyn MetadataProvider>>,
        auto_rip: bool,
    ) -> Self {
        Self {
            workflows,
            metadata,
            auto_rip,
        }
    }

    /// Create or look up the workflow for the main title of `disc`.
    ///
    /// Returns `None` when the disc has no titles.
    pub async fn process(&self, disc: &Disc) -> Result<Option<Workflow>> {
        let info = self.workflows.disc_info(&disc.uuid).await?;
        let Some(title) = info.main_title() else {
            warn!(uuid = %disc.uuid, label = %disc.label, "Disc has no titles");
            return Ok(None);
        };
        let name = info.guess_name().unwrap_or_else(|| disc.label.clone());

        let (mut wf, is_new) =
            self.workflows
                .new_workflow(&disc.uuid, title.id, &disc.label, &name);
        if is_new {
            info!(disc_id = %wf.disc_id, title_id = wf.title_id, "New workflow for {:?}", name);
            self.prefill(&mut wf).await;
            self.workflows.save(&wf)?;
        }

        if self.auto_rip && wf.status == WorkflowStatus::Start {
            let workflows = Arc::clone(&self.workflows);
            let start = wf.clone();
            tokio::spawn(async move {
                if let Err(e) = workflows.start(&start, None).await {
                    error!(
                        disc_id = %start.disc_id,
                        title_id = start.title_id,
                        "Automatic rip failed: {}",
                        e
                    );
                }
            });
        }
        Ok(Some(wf))
    }

    async fn prefill(&self, wf: &mut Workflow) {
        let Some(provider) = self.metadata.as_ref().filter(|p| p.is_available()) else {
            return;
        };
        match find_movie(provider.as_ref(), &wf.original_name).await {
            Ok(Some(movie)) => {
                info!(
                    disc_id = %wf.disc_id,
                    title_id = wf.title_id,
                    "{} match: {} ({}) {}",
                    provider.name(),
                    movie.title,
                    movie.year,
                    movie.imdb_id
                );
                wf.name = Some(movie.title);
                wf.year = Some(movie.year);
                wf.imdb_id = Some(movie.imdb_id);
            }
            Ok(None) => info!("No {} match for {:?}", provider.name(), wf.original_name),
            Err(e) => warn!("{} lookup for {:?} failed: {:#}", provider.name(), wf.original_name, e),
        }
    }
}

#[async_trait]
impl DiscHandler for DiscProcessor {
    async fn handle_disc(&self, disc: Disc) {
        if let Err(e) = self.process(&disc).await {
            error!(uuid = %disc.uuid, label = %disc.label, "Failed to process disc: {}", e);
        }
    }
}
