//! Database operations for the `products.tags` table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `products.tags` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagRow {
    pub guid: Uuid,
    pub en: String,
    pub pl: String,
    pub created_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// Inserts a new live tag and returns its row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// violations on either language label.
pub async fn insert_tag(
    conn: &mut PgConnection,
    guid: Uuid,
    en: &str,
    pl: &str,
    created_at: DateTime<Utc>,
) -> Result<TagRow, DbError> {
    let row = sqlx::query_as::<_, TagRow>(
        "INSERT INTO products.tags (guid, en, pl, created_at) \
         VALUES ($1, $2, $3, $4) \
         RETURNING guid, en, pl, created_at, removed_at",
    )
    .bind(guid)
    .bind(en)
    .bind(pl)
    .bind(created_at)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Returns a single live tag by guid, or `None` if absent or removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_tag(conn: &mut PgConnection, guid: Uuid) -> Result<Option<TagRow>, DbError> {
    let row = sqlx::query_as::<_, TagRow>(
        "SELECT guid, en, pl, created_at, removed_at \
         FROM products.tags \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Resolves a set of tag guids against live tags.
///
/// The result may be shorter than the input when some guids are unknown or
/// removed; callers compare lengths to detect dangling references.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_tags_by_guids(
    conn: &mut PgConnection,
    guids: &[Uuid],
) -> Result<Vec<TagRow>, DbError> {
    let rows = sqlx::query_as::<_, TagRow>(
        "SELECT guid, en, pl, created_at, removed_at \
         FROM products.tags \
         WHERE guid = ANY($1) AND removed_at IS NULL \
         ORDER BY created_at, guid",
    )
    .bind(guids)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Whether a live tag already uses either of the given labels.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn tag_exists(conn: &mut PgConnection, en: &str, pl: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.tags \
             WHERE (en = $1 OR pl = $2) AND removed_at IS NULL \
         )",
    )
    .bind(en)
    .bind(pl)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Soft-deletes a live tag by stamping `removed_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn soft_delete_tag(
    conn: &mut PgConnection,
    guid: Uuid,
    removed_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.tags \
         SET removed_at = $2 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(removed_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Returns a page of live tags, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_tags(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<TagRow>, DbError> {
    let rows = sqlx::query_as::<_, TagRow>(
        "SELECT guid, en, pl, created_at, removed_at \
         FROM products.tags \
         WHERE removed_at IS NULL \
         ORDER BY created_at, guid \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of live tags.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_tag_count(pool: &PgPool) -> Result<i64, DbError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products.tags WHERE removed_at IS NULL")
            .fetch_one(pool)
            .await?;

    Ok(count)
}
