//! Database operations for the `products.brands` table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `products.brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub guid: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new live brand and returns its row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// violations on `(name, removed_at)`.
pub async fn insert_brand(
    conn: &mut PgConnection,
    guid: Uuid,
    name: &str,
    logo_url: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(
        "INSERT INTO products.brands (guid, name, logo_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) \
         RETURNING guid, name, logo_url, created_at, updated_at, removed_at",
    )
    .bind(guid)
    .bind(name)
    .bind(logo_url)
    .bind(created_at)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Returns a single live brand by guid, or `None` if absent or removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_brand(
    conn: &mut PgConnection,
    guid: Uuid,
) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(
        "SELECT guid, name, logo_url, created_at, updated_at, removed_at \
         FROM products.brands \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Whether a live brand with the given name exists.
///
/// A courtesy check for friendlier errors; the unique constraint remains the
/// authoritative guard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn brand_name_exists(conn: &mut PgConnection, name: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.brands \
             WHERE name = $1 AND removed_at IS NULL \
         )",
    )
    .bind(name)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Updates a live brand's name and logo in place.
///
/// Returns the number of rows affected (zero when the brand is absent or
/// removed).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_brand_row(
    conn: &mut PgConnection,
    guid: Uuid,
    name: &str,
    logo_url: Option<&str>,
    updated_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.brands \
         SET name = $2, logo_url = $3, updated_at = $4 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(name)
    .bind(logo_url)
    .bind(updated_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Soft-deletes a live brand by stamping `removed_at`.
///
/// Returns the number of rows affected.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn soft_delete_brand(
    conn: &mut PgConnection,
    guid: Uuid,
    removed_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.brands \
         SET removed_at = $2 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(removed_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Returns a page of live brands, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_brands(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(
        "SELECT guid, name, logo_url, created_at, updated_at, removed_at \
         FROM products.brands \
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

/// Total number of live brands.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_brand_count(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products.brands WHERE removed_at IS NULL",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
