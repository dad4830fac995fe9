//! Database operations for `products.products` and the `products_tags`
//! junction table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::tags::TagRow;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products.products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub guid: Uuid,
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_pl: String,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    pub discount: Option<i32>,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
    pub category_guid: Uuid,
    pub brand_guid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

/// Column values for inserting or rewriting a product row.
#[derive(Debug, Clone)]
pub struct NewProductRow {
    pub sku: String,
    pub name_en: String,
    pub name_pl: String,
    pub image_url: Option<String>,
    pub description_en: String,
    pub description_pl: String,
    pub base_price_usd: Decimal,
    pub base_price_pln: Decimal,
    pub discount: Option<i32>,
    pub quantity: Decimal,
    pub weight: i32,
    pub color_en: String,
    pub color_pl: String,
    pub category_guid: Uuid,
    pub brand_guid: Uuid,
}

// ---------------------------------------------------------------------------
// products operations
// ---------------------------------------------------------------------------

/// Name of the first product field conflicting with a live row, if any.
///
/// Checks `sku`, `name_en`, and `name_pl` against live products, optionally
/// excluding one guid (the product being updated). A courtesy check for
/// friendlier errors; the unique constraints remain the authoritative guard.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_conflict_field(
    conn: &mut PgConnection,
    sku: &str,
    name_en: &str,
    name_pl: &str,
    exclude_guid: Option<Uuid>,
) -> Result<Option<String>, DbError> {
    let field = sqlx::query_scalar::<_, String>(
        "SELECT CASE \
             WHEN sku = $1 THEN 'sku' \
             WHEN name_en = $2 THEN 'name_en' \
             ELSE 'name_pl' \
         END \
         FROM products.products \
         WHERE removed_at IS NULL \
           AND (sku = $1 OR name_en = $2 OR name_pl = $3) \
           AND ($4::uuid IS NULL OR guid <> $4) \
         LIMIT 1",
    )
    .bind(sku)
    .bind(name_en)
    .bind(name_pl)
    .bind(exclude_guid)
    .fetch_optional(conn)
    .await?;

    Ok(field)
}

/// Inserts a new live product and returns its row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// and foreign-key violations.
pub async fn insert_product(
    conn: &mut PgConnection,
    guid: Uuid,
    row: &NewProductRow,
    created_at: DateTime<Utc>,
) -> Result<ProductRow, DbError> {
    let inserted = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products.products \
             (guid, sku, name_en, name_pl, image_url, description_en, description_pl, \
              base_price_usd, base_price_pln, discount, quantity, weight, \
              color_en, color_pl, category_guid, brand_guid, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16, $17, $17) \
         RETURNING guid, sku, name_en, name_pl, image_url, description_en, description_pl, \
                   base_price_usd, base_price_pln, discount, quantity, weight, \
                   color_en, color_pl, category_guid, brand_guid, \
                   created_at, updated_at, removed_at",
    )
    .bind(guid)
    .bind(&row.sku)
    .bind(&row.name_en)
    .bind(&row.name_pl)
    .bind(&row.image_url)
    .bind(&row.description_en)
    .bind(&row.description_pl)
    .bind(row.base_price_usd)
    .bind(row.base_price_pln)
    .bind(row.discount)
    .bind(row.quantity)
    .bind(row.weight)
    .bind(&row.color_en)
    .bind(&row.color_pl)
    .bind(row.category_guid)
    .bind(row.brand_guid)
    .bind(created_at)
    .fetch_one(conn)
    .await?;

    Ok(inserted)
}

/// Rewrites all attributes of a live product and returns the updated row,
/// or `None` when the product is absent or removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product_row(
    conn: &mut PgConnection,
    guid: Uuid,
    row: &NewProductRow,
    updated_at: DateTime<Utc>,
) -> Result<Option<ProductRow>, DbError> {
    let updated = sqlx::query_as::<_, ProductRow>(
        "UPDATE products.products SET \
             sku = $2, name_en = $3, name_pl = $4, image_url = $5, \
             description_en = $6, description_pl = $7, \
             base_price_usd = $8, base_price_pln = $9, discount = $10, \
             quantity = $11, weight = $12, color_en = $13, color_pl = $14, \
             category_guid = $15, brand_guid = $16, updated_at = $17 \
         WHERE guid = $1 AND removed_at IS NULL \
         RETURNING guid, sku, name_en, name_pl, image_url, description_en, description_pl, \
                   base_price_usd, base_price_pln, discount, quantity, weight, \
                   color_en, color_pl, category_guid, brand_guid, \
                   created_at, updated_at, removed_at",
    )
    .bind(guid)
    .bind(&row.sku)
    .bind(&row.name_en)
    .bind(&row.name_pl)
    .bind(&row.image_url)
    .bind(&row.description_en)
    .bind(&row.description_pl)
    .bind(row.base_price_usd)
    .bind(row.base_price_pln)
    .bind(row.discount)
    .bind(row.quantity)
    .bind(row.weight)
    .bind(&row.color_en)
    .bind(&row.color_pl)
    .bind(row.category_guid)
    .bind(row.brand_guid)
    .bind(updated_at)
    .fetch_optional(conn)
    .await?;

    Ok(updated)
}

/// Returns a single live product by guid, or `None` if absent or removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_live_product(
    conn: &mut PgConnection,
    guid: Uuid,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT guid, sku, name_en, name_pl, image_url, description_en, description_pl, \
                base_price_usd, base_price_pln, discount, quantity, weight, \
                color_en, color_pl, category_guid, brand_guid, \
                created_at, updated_at, removed_at \
         FROM products.products \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Soft-deletes a live product by stamping `removed_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn soft_delete_product(
    conn: &mut PgConnection,
    guid: Uuid,
    removed_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE products.products \
         SET removed_at = $2 \
         WHERE guid = $1 AND removed_at IS NULL",
    )
    .bind(guid)
    .bind(removed_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Returns a page of live products, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_products(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT guid, sku, name_en, name_pl, image_url, description_en, description_pl, \
                base_price_usd, base_price_pln, discount, quantity, weight, \
                color_en, color_pl, category_guid, brand_guid, \
                created_at, updated_at, removed_at \
         FROM products.products \
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

/// Total number of live products.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_product_count(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products.products WHERE removed_at IS NULL",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

// ---------------------------------------------------------------------------
// products_tags operations
// ---------------------------------------------------------------------------

/// Replaces a product's tag set with the given guids.
///
/// The previous associations are deleted, not merged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn replace_product_tags(
    conn: &mut PgConnection,
    product_guid: Uuid,
    tag_guids: &[Uuid],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM products.products_tags WHERE product_guid = $1")
        .bind(product_guid)
        .execute(&mut *conn)
        .await?;

    if !tag_guids.is_empty() {
        sqlx::query(
            "INSERT INTO products.products_tags (product_guid, tag_guid) \
             SELECT $1, unnest($2::uuid[])",
        )
        .bind(product_guid)
        .bind(tag_guids)
        .execute(conn)
        .await?;
    }

    Ok(())
}

/// Returns the live tags attached to a product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_tags(
    conn: &mut PgConnection,
    product_guid: Uuid,
) -> Result<Vec<TagRow>, DbError> {
    let rows = sqlx::query_as::<_, TagRow>(
        "SELECT t.guid, t.en, t.pl, t.created_at, t.removed_at \
         FROM products.tags t \
         JOIN products.products_tags pt ON pt.tag_guid = t.guid \
         WHERE pt.product_guid = $1 AND t.removed_at IS NULL \
         ORDER BY t.created_at, t.guid",
    )
    .bind(product_guid)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// referential-integrity checks
// ---------------------------------------------------------------------------

/// Whether any live product references the given brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_product_references_brand(
    conn: &mut PgConnection,
    brand_guid: Uuid,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.products \
             WHERE brand_guid = $1 AND removed_at IS NULL \
         )",
    )
    .bind(brand_guid)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Whether any live product references the given category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_product_references_category(
    conn: &mut PgConnection,
    category_guid: Uuid,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.products \
             WHERE category_guid = $1 AND removed_at IS NULL \
         )",
    )
    .bind(category_guid)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Whether any live product carries the given tag.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn live_product_with_tag(
    conn: &mut PgConnection,
    tag_guid: Uuid,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM products.products_tags pt \
             JOIN products.products p ON p.guid = pt.product_guid \
             WHERE pt.tag_guid = $1 AND p.removed_at IS NULL \
         )",
    )
    .bind(tag_guid)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}
