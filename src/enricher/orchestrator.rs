use crate::constants;
use crate::enricher::merge;
use crate::error::{EnrichmentError, StoreError};
use crate::llm::TextGenerationClient;
use crate::models::{Asset, AssetEvent, WriteOperation, WriteOrigin};
use crate::store::Store;
use crate::tagger::{MetadataGenerator, TagReconciler};
use std::sync::Arc;

/// Result of handling one asset change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// The event does not call for enrichment, or a newer write owns the asset
    Skipped,
    /// Enrichment ran but there was nothing to write
    Unchanged,
    /// Generated metadata was merged and persisted
    Enriched(Asset),
    /// Enrichment failed; the asset was left as it was
    Failed(String),
}

/// Runs metadata enrichment for asset create/replace events.
///
/// Enrichment is best effort: the triggering write has already happened,
/// and every failure is logged and contained here.
pub struct Enricher {
    store: Arc<dyn Store>,
    generator: MetadataGenerator,
    reconciler: TagReconciler,
}

impl Enricher {
    pub fn new(store: Arc<dyn Store>, client: Arc<TextGenerationClient>) -> Self {
        Self {
            generator: MetadataGenerator::new(client),
            reconciler: TagReconciler::new(store.clone()),
            store,
        }
    }

    /// Enrich on creation or when the file was replaced. Metadata-only edits
    /// and enrichment's own writes never qualify.
    pub fn should_enrich(event: &AssetEvent) -> bool {
        event.origin == WriteOrigin::User
            && (event.operation == WriteOperation::Create || event.file_changed())
    }

    /// Handle one event. Never fails; see [`EnrichmentOutcome`].
    pub async fn handle(&self, event: &AssetEvent) -> EnrichmentOutcome {
        if !Self::should_enrich(event) {
            return EnrichmentOutcome::Skipped;
        }

        let asset_id = event.current.id;
        match self.enrich(event).await {
            Ok(outcome) => {
                match &outcome {
                    EnrichmentOutcome::Enriched(_) => tracing::info!(%asset_id, "Asset enriched"),
                    other => tracing::debug!(%asset_id, outcome = ?other, "Enrichment finished"),
                }
                outcome
            }
            Err(err) => {
                tracing::warn!(%asset_id, error = %err, "Enrichment failed; asset left unchanged");
                EnrichmentOutcome::Failed(err.to_string())
            }
        }
    }

    async fn enrich(&self, event: &AssetEvent) -> Result<EnrichmentOutcome, EnrichmentError> {
        // Merge against the stored record rather than the event snapshot so a
        // redelivered event sees enrichment that already landed.
        let Some(asset) = self.store.get_asset(event.current.id).await? else {
            tracing::debug!(asset_id = %event.current.id, "Asset no longer exists");
            return Ok(EnrichmentOutcome::Skipped);
        };
        if asset.file != event.current.file {
            tracing::debug!(asset_id = %asset.id, "File replaced again since this event");
            return Ok(EnrichmentOutcome::Skipped);
        }
        if asset.is_fully_described() {
            return Ok(EnrichmentOutcome::Unchanged);
        }

        let filename = asset.file.file_name();
        tracing::debug!(asset_id = %asset.id, filename, "Generating metadata");
        let generated = self.generator.generate(filename).await?;

        let tag_ids = if asset.has_tags() || generated.tag_names.is_empty() {
            Vec::new()
        } else {
            self.reconciler.resolve(&generated.tag_names).await?
        };

        // Generation takes a while and user writes may land meanwhile. Merge
        // against a fresh read and make the write conditional on it, so user
        // values win and metadata for a replaced file is discarded.
        let mut attempt = 1;
        loop {
            let Some(fresh) = self.store.get_asset(asset.id).await? else {
                return Ok(EnrichmentOutcome::Skipped);
            };
            if fresh.file != event.current.file {
                tracing::debug!(asset_id = %fresh.id, "File replaced during generation");
                return Ok(EnrichmentOutcome::Skipped);
            }

            let patch = merge::merge(&fresh, &generated, tag_ids.clone());
            if patch.is_empty() {
                return Ok(EnrichmentOutcome::Unchanged);
            }

            match self
                .store
                .update_asset(fresh.id, patch, WriteOrigin::Enrichment)
                .await
            {
                Ok(updated) => return Ok(EnrichmentOutcome::Enriched(updated)),
                Err(StoreError::Stale { .. }) if attempt < constants::STALE_WRITE_RETRIES => {
                    tracing::debug!(asset_id = %fresh.id, attempt, "Asset changed before write, merging again");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
