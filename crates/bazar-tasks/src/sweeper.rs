//! Periodic inbox sweep: re-enqueue events left unprocessed past a grace
//! period, covering dispatch failures, cancelled requests, and dead-lettered
//! jobs.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use bazar_core::Clock;

use crate::dispatch::{TaskDispatcher, TaskKind};
use crate::TaskError;

/// How many pending events a single sweep will re-enqueue.
const SWEEP_BATCH_LIMIT: i64 = 500;

/// Registers the every-minute inbox sweep on the scheduler.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the job cannot be registered.
pub async fn register_sweeper_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    dispatcher: Arc<dyn TaskDispatcher>,
    clock: Arc<dyn Clock>,
    grace_secs: u64,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let dispatcher = Arc::clone(&dispatcher);
        let clock = Arc::clone(&clock);

        Box::pin(async move {
            match sweep_once(&pool, dispatcher.as_ref(), clock.as_ref(), grace_secs).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(re_enqueued = n, "sweeper: resurrected pending events"),
                Err(e) => tracing::error!(error = %e, "sweeper: sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Re-enqueues pending events older than the grace period.
///
/// Only the event kinds with a consumer are swept; the reserved kinds stay
/// in the inbox untouched. Returns the number of events re-enqueued.
/// Re-enqueueing an event that a worker completes concurrently is harmless:
/// `load_pending` turns the duplicate delivery into a no-op.
///
/// # Errors
///
/// Returns [`TaskError`] if the pending scan fails; individual enqueue
/// failures are logged and skipped so one broker hiccup does not abort the
/// sweep.
pub async fn sweep_once(
    pool: &PgPool,
    dispatcher: &dyn TaskDispatcher,
    clock: &dyn Clock,
    grace_secs: u64,
) -> Result<usize, TaskError> {
    let grace = chrono::Duration::seconds(i64::try_from(grace_secs).unwrap_or(i64::MAX));
    let cutoff = clock.now() - grace;

    let stale = bazar_db::list_stale_pending(
        pool,
        cutoff,
        &[
            bazar_db::InboxEventType::ProductUpdated,
            bazar_db::InboxEventType::ProductRemoved,
        ],
        SWEEP_BATCH_LIMIT,
    )
    .await?;

    let mut re_enqueued = 0;
    for event in stale {
        let Some(kind) = event.kind().and_then(TaskKind::for_event) else {
            continue;
        };
        match dispatcher.enqueue(kind, event.guid).await {
            Ok(()) => re_enqueued += 1,
            Err(e) => {
                tracing::warn!(error = %e, event = %event.guid, "sweeper: enqueue failed");
            }
        }
    }

    Ok(re_enqueued)
}
