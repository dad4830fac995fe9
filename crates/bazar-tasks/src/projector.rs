//! The projection worker's core: load an inbox event, apply it to the
//! document store, mark it processed.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use bazar_core::Clock;
use bazar_db::InboxEventType;
use bazar_store::{DocumentStore, ProductDocument, ProductRemoval};

use crate::TaskError;

/// What a single projection run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// The document store was mutated.
    Applied,
    /// The event was older than the materialized document; it was consumed
    /// without touching the store.
    SkippedStale,
    /// The event was missing or already processed, so redelivery is a no-op.
    AlreadyProcessed,
    /// The event type has no projector; the row stays pending.
    Unsupported,
}

/// Applies inbox events to the document store, idempotently.
///
/// The policy is apply-then-mark: a crash between the two produces a
/// redundant re-apply on retry, which is safe because apply is a
/// whole-document replace or delete.
pub struct Projector {
    pool: PgPool,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl Projector {
    #[must_use]
    pub fn new(pool: PgPool, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { pool, store, clock }
    }

    /// Processes one job.
    ///
    /// Reprocessing any event is a no-op once it has been marked processed,
    /// and out-of-order delivery is absorbed by the stale-write guard: an
    /// event strictly older than the stored document's `updated_at` is
    /// consumed without applying. Ties apply, so a removal carrying the same
    /// timestamp as the document wins.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] on storage failure or an undecodable payload;
    /// the caller retries and eventually dead-letters the job while the
    /// inbox row stays pending.
    pub async fn process(&self, event_guid: Uuid) -> Result<ProjectionOutcome, TaskError> {
        let Some(event) = bazar_db::load_pending(&self.pool, event_guid).await? else {
            tracing::debug!(event = %event_guid, "event missing or already processed");
            return Ok(ProjectionOutcome::AlreadyProcessed);
        };

        let outcome = match event.kind() {
            Some(InboxEventType::ProductUpdated) => {
                let doc: ProductDocument = decode_payload(event_guid, &event.data)?;
                self.apply_update(doc).await?
            }
            Some(InboxEventType::ProductRemoved) => {
                let removal: ProductRemoval = decode_payload(event_guid, &event.data)?;
                self.apply_removal(&removal).await?
            }
            Some(kind) => {
                tracing::warn!(event = %event_guid, %kind, "no projector for event type");
                return Ok(ProjectionOutcome::Unsupported);
            }
            None => {
                return Err(TaskError::MalformedJob {
                    event_guid,
                    reason: format!("unknown event type '{}'", event.event_type),
                })
            }
        };

        bazar_db::mark_processed(&self.pool, event_guid, self.clock.now()).await?;

        tracing::info!(
            event = %event_guid,
            event_type = %event.event_type,
            ?outcome,
            "projection event consumed"
        );
        Ok(outcome)
    }

    async fn apply_update(&self, doc: ProductDocument) -> Result<ProjectionOutcome, TaskError> {
        if let Some(existing) = self.store.get_product(doc.guid).await? {
            if doc.updated_at < existing.updated_at {
                tracing::debug!(
                    product = %doc.guid,
                    incoming = %doc.updated_at,
                    stored = %existing.updated_at,
                    "stale update skipped"
                );
                return Ok(ProjectionOutcome::SkippedStale);
            }
        }

        self.store.put_product(&doc).await?;
        Ok(ProjectionOutcome::Applied)
    }

    async fn apply_removal(&self, removal: &ProductRemoval) -> Result<ProjectionOutcome, TaskError> {
        if let Some(existing) = self.store.get_product(removal.guid).await? {
            if removal.updated_at < existing.updated_at {
                tracing::debug!(
                    product = %removal.guid,
                    incoming = %removal.updated_at,
                    stored = %existing.updated_at,
                    "stale removal skipped"
                );
                return Ok(ProjectionOutcome::SkippedStale);
            }
        }

        // Deleting a missing key is a success.
        self.store.delete_product(removal.guid).await?;
        Ok(ProjectionOutcome::Applied)
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    event_guid: Uuid,
    data: &serde_json::Value,
) -> Result<T, TaskError> {
    serde_json::from_value(data.clone()).map_err(|e| TaskError::MalformedJob {
        event_guid,
        reason: e.to_string(),
    })
}
