//! The transactional inbox: an append-only log of projection work for the
//! read model, committed atomically with the business write.
//!
//! Rows are never updated except to stamp `processed_at`, exactly once.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

/// Discriminant for inbox events.
///
/// `CategoryUpdated`, `CategoryRemoved`, and `TagRemoved` are recorded but
/// currently have no consumer; they stay pending in the inbox for future
/// projectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboxEventType {
    ProductUpdated,
    ProductRemoved,
    CategoryUpdated,
    CategoryRemoved,
    TagRemoved,
}

impl InboxEventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductUpdated => "PRODUCT_UPDATED",
            Self::ProductRemoved => "PRODUCT_REMOVED",
            Self::CategoryUpdated => "CATEGORY_UPDATED",
            Self::CategoryRemoved => "CATEGORY_REMOVED",
            Self::TagRemoved => "TAG_REMOVED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRODUCT_UPDATED" => Some(Self::ProductUpdated),
            "PRODUCT_REMOVED" => Some(Self::ProductRemoved),
            "CATEGORY_UPDATED" => Some(Self::CategoryUpdated),
            "CATEGORY_REMOVED" => Some(Self::CategoryRemoved),
            "TAG_REMOVED" => Some(Self::TagRemoved),
            _ => None,
        }
    }
}

impl std::fmt::Display for InboxEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `store.inbox_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InboxEventRow {
    pub guid: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl InboxEventRow {
    /// Typed event discriminant, `None` for values written by a newer schema.
    #[must_use]
    pub fn kind(&self) -> Option<InboxEventType> {
        InboxEventType::parse(&self.event_type)
    }
}

/// Appends a pending event and returns its freshly minted guid.
///
/// Must be called on a connection inside the transaction that performs the
/// business write, so both commit or neither does.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn append_event(
    conn: &mut PgConnection,
    event_type: InboxEventType,
    data: &serde_json::Value,
    created_at: DateTime<Utc>,
) -> Result<Uuid, DbError> {
    let guid = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO store.inbox_events (guid, event_type, data, created_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(guid)
    .bind(event_type.as_str())
    .bind(data)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(guid)
}

/// Loads an event that is still pending.
///
/// Returns `None` both when the event does not exist and when it has already
/// been processed, which makes redelivered jobs a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_pending(pool: &PgPool, guid: Uuid) -> Result<Option<InboxEventRow>, DbError> {
    let row = sqlx::query_as::<_, InboxEventRow>(
        "SELECT guid, event_type, data, created_at, processed_at \
         FROM store.inbox_events \
         WHERE guid = $1 AND processed_at IS NULL",
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Stamps `processed_at` on a pending event.
///
/// The `processed_at IS NULL` guard means the timestamp is set at most once;
/// a second call returns `false` and changes nothing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_processed(pool: &PgPool, guid: Uuid, at: DateTime<Utc>) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE store.inbox_events \
         SET processed_at = $2 \
         WHERE guid = $1 AND processed_at IS NULL",
    )
    .bind(guid)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Pending events of the given kinds created before `cutoff`, oldest first.
///
/// Used by the sweeper to re-enqueue work whose dispatch was lost. The scan
/// hits the partial index on `(created_at) WHERE processed_at IS NULL`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_pending(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    kinds: &[InboxEventType],
    limit: i64,
) -> Result<Vec<InboxEventRow>, DbError> {
    let kind_names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    let rows = sqlx::query_as::<_, InboxEventRow>(
        "SELECT guid, event_type, data, created_at, processed_at \
         FROM store.inbox_events \
         WHERE processed_at IS NULL \
           AND created_at < $1 \
           AND event_type = ANY($2) \
         ORDER BY created_at \
         LIMIT $3",
    )
    .bind(cutoff)
    .bind(&kind_names)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
