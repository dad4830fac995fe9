//! Database operations for the `products.categories` table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `products.categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub guid: Uuid,
    pub name_en: String,
    pub name_pl: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// Inserts a new live category and returns its row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// violations on either language name.
pub async fn insert_category(
    conn: &mut PgConnection,
    guid: Uuid,
    name_en: &str,
    name_pl: &str,
    created_at: DateTime<Utc>,
) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO products.categories (guid, name_en, name_pl, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) \
         RETURNING guid, name_en, name_pl, created_at, updated_at, removed_at",
    )
    .bind(guid)
    .bind(name_en)
    .bind(name_pl)
    .bind(created_at)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Returns a single live category by guid, or `None` if absent or removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_category(
    conn: &mut PgConnection,
    guid: Uuid,
) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT guid, name_en, name_pl, created_at, updated_at, removed_at \
         FROM products.categories \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Whether a live category already uses either of the given names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_name_exists(
    conn: &mut PgConnection,
    name_en: &str,
    name_pl: &str,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.categories \
             WHERE (name_en = $1 OR name_pl = $2) AND removed_at IS NULL \
         )",
    )
    .bind(name_en)
    .bind(name_pl)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Updates a live category's names in place.
///
/// Returns the number of rows affected (zero when the category is absent or
/// removed).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_category_row(
    conn: &mut PgConnection,
    guid: Uuid,
    name_en: &str,
    name_pl: &str,
    updated_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.categories \
         SET name_en = $2, name_pl = $3, updated_at = $4 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(name_en)
    .bind(name_pl)
    .bind(updated_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Soft-deletes a live category by stamping `removed_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn soft_delete_category(
    conn: &mut PgConnection,
    guid: Uuid,
    removed_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.categories \
         SET removed_at = $2 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(removed_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Returns a page of live categories, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_categories(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT guid, name_en, name_pl, created_at, updated_at, removed_at \
         FROM products.categories \
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

/// Total number of live categories.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_category_count(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products.categories WHERE removed_at IS NULL",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
