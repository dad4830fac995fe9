//! Idempotent process bootstrap: migrations, buckets, search index.

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::storage::{ObjectStorageGateway, S3_BUCKETS};

/// Brings external resources to their required state. Every step tolerates
/// the resource already existing, so repeated startups are safe.
///
/// # Errors
///
/// Any failure here is fatal for the process: the caller exits non-zero.
pub async fn bootstrap(
    pool: &PgPool,
    redis: &ConnectionManager,
    storage: &ObjectStorageGateway,
) -> anyhow::Result<()> {
    let applied = bazar_db::run_migrations(pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied database migrations");
    }

    for bucket in S3_BUCKETS {
        storage.ensure_bucket(bucket).await?;
    }

    bazar_store::ensure_index(redis).await?;

    Ok(())
}
