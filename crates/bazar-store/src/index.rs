//! Idempotent creation of the product search index.

use redis::aio::ConnectionManager;

use crate::StoreError;

/// Name of the search index over `product:` keys.
pub const INDEX_NAME: &str = "idx:products";

/// Ensures `idx:products` exists, creating it when absent.
///
/// Probes with `FT.INFO` first; an "unknown index" reply triggers creation,
/// any other reply means the index is already in place. Creating an existing
/// index is therefore a success, which keeps process start idempotent.
///
/// # Errors
///
/// Returns [`StoreError::Redis`] when the probe or the create command fails
/// for a reason other than the index being absent.
pub async fn ensure_index(conn: &ConnectionManager) -> Result<(), StoreError> {
    let mut conn = conn.clone();

    let info: Result<redis::Value, redis::RedisError> = redis::cmd("FT.INFO")
        .arg(INDEX_NAME)
        .query_async(&mut conn)
        .await;

    match info {
        Ok(_) => return Ok(()),
        Err(e) if is_unknown_index(&e) => {}
        Err(e) => return Err(e.into()),
    }

    tracing::info!(index = INDEX_NAME, "creating search index");

    redis::cmd("FT.CREATE")
        .arg(INDEX_NAME)
        .arg("ON")
        .arg("JSON")
        .arg("PREFIX")
        .arg(1)
        .arg("product:")
        .arg("SCHEMA")
        .arg("$.guid")
        .arg("AS")
        .arg("guid")
        .arg("TAG")
        .arg("$.sku")
        .arg("AS")
        .arg("sku")
        .arg("TAG")
        .arg("$.name_en")
        .arg("AS")
        .arg("name_en")
        .arg("TEXT")
        .arg("SORTABLE")
        .arg("$.name_pl")
        .arg("AS")
        .arg("name_pl")
        .arg("TEXT")
        .arg("SORTABLE")
        .arg("$.description_en")
        .arg("AS")
        .arg("description_en")
        .arg("TEXT")
        .arg("$.description_pl")
        .arg("AS")
        .arg("description_pl")
        .arg("TEXT")
        .arg("$.color_en")
        .arg("AS")
        .arg("color_en")
        .arg("TAG")
        .arg("$.color_pl")
        .arg("AS")
        .arg("color_pl")
        .arg("TAG")
        .arg("$.tags_en[*]")
        .arg("AS")
        .arg("tags_en")
        .arg("TAG")
        .arg("$.tags_pl[*]")
        .arg("AS")
        .arg("tags_pl")
        .arg("TAG")
        .arg("$.category_en")
        .arg("AS")
        .arg("category_en")
        .arg("TAG")
        .arg("SORTABLE")
        .arg("$.category_pl")
        .arg("AS")
        .arg("category_pl")
        .arg("TAG")
        .arg("SORTABLE")
        .arg("$.brand_name")
        .arg("AS")
        .arg("brand_name")
        .arg("TAG")
        .arg("SORTABLE")
        .arg("$.discounted_price_usd")
        .arg("AS")
        .arg("discounted_price_usd")
        .arg("NUMERIC")
        .arg("SORTABLE")
        .arg("$.discounted_price_pln")
        .arg("AS")
        .arg("discounted_price_pln")
        .arg("NUMERIC")
        .arg("SORTABLE")
        .query_async::<()>(&mut conn)
        .await?;

    Ok(())
}

/// Whether an `FT.INFO` error means "this index does not exist yet".
///
/// Redis Stack has reported both spellings across versions.
fn is_unknown_index(err: &redis::RedisError) -> bool {
    let detail = err.detail().unwrap_or_default().to_ascii_lowercase();
    detail.contains("unknown index") || detail.contains("no such index")
}
