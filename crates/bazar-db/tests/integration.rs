//! Database integration tests for the inbox repository and soft-delete
//! uniqueness rules. Each test runs against a fresh migrated database
//! provided by `#[sqlx::test]`.

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use bazar_db::{InboxEventType, NewProductRow};
use rust_decimal::Decimal;

fn new_product_row(sku: &str, name: &str, category: Uuid, brand: Uuid) -> NewProductRow {
    NewProductRow {
        sku: sku.to_string(),
        name_en: name.to_string(),
        name_pl: format!("{name} (pl)"),
        image_url: None,
        description_en: "A vegetable.".to_string(),
        description_pl: "Warzywo.".to_string(),
        base_price_usd: Decimal::new(4800, 2),
        base_price_pln: Decimal::new(19443, 2),
        discount: Some(64),
        quantity: Decimal::new(5413, 0),
        weight: 3,
        color_en: "Green".to_string(),
        color_pl: "Zielony".to_string(),
        category_guid: category,
        brand_guid: brand,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn inbox_append_load_mark_cycle(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut conn = pool.acquire().await.expect("acquire");

    let guid = bazar_db::append_event(
        &mut conn,
        InboxEventType::ProductUpdated,
        &json!({"guid": Uuid::new_v4()}),
        now,
    )
    .await
    .expect("append");
    drop(conn);

    let event = bazar_db::load_pending(&pool, guid)
        .await
        .expect("load")
        .expect("event should be pending");
    assert_eq!(event.kind(), Some(InboxEventType::ProductUpdated));
    assert!(event.processed_at.is_none());

    let marked = bazar_db::mark_processed(&pool, guid, now + Duration::seconds(1))
        .await
        .expect("mark");
    assert!(marked, "first mark should succeed");

    // Processed events are invisible to load_pending, so redelivery is a no-op.
    assert!(bazar_db::load_pending(&pool, guid)
        .await
        .expect("load")
        .is_none());

    // The processed timestamp is set at most once.
    let marked_again = bazar_db::mark_processed(&pool, guid, now + Duration::seconds(2))
        .await
        .expect("mark again");
    assert!(!marked_again, "second mark must not overwrite the first");
}

#[sqlx::test(migrations = "../../migrations")]
async fn load_pending_returns_none_for_unknown_guid(pool: sqlx::PgPool) {
    assert!(bazar_db::load_pending(&pool, Uuid::new_v4())
        .await
        .expect("load")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn stale_pending_listing_filters_by_kind_and_cutoff(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut conn = pool.acquire().await.expect("acquire");

    let old_update = bazar_db::append_event(
        &mut conn,
        InboxEventType::ProductUpdated,
        &json!({}),
        now - Duration::minutes(10),
    )
    .await
    .expect("append");
    let old_tag_removal = bazar_db::append_event(
        &mut conn,
        InboxEventType::TagRemoved,
        &json!({}),
        now - Duration::minutes(10),
    )
    .await
    .expect("append");
    let fresh_update = bazar_db::append_event(
        &mut conn,
        InboxEventType::ProductUpdated,
        &json!({}),
        now,
    )
    .await
    .expect("append");
    drop(conn);

    let stale = bazar_db::list_stale_pending(
        &pool,
        now - Duration::minutes(1),
        &[
            InboxEventType::ProductUpdated,
            InboxEventType::ProductRemoved,
        ],
        100,
    )
    .await
    .expect("list");

    let guids: Vec<Uuid> = stale.iter().map(|e| e.guid).collect();
    assert!(guids.contains(&old_update), "old update should be swept");
    assert!(
        !guids.contains(&old_tag_removal),
        "unconsumed kinds are not swept"
    );
    assert!(
        !guids.contains(&fresh_update),
        "events inside the grace period are not swept"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn soft_deleted_brand_frees_its_name(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut conn = pool.acquire().await.expect("acquire");

    let first = bazar_db::insert_brand(&mut conn, Uuid::new_v4(), "Farmary", None, now)
        .await
        .expect("insert");

    // A second live brand of the same name violates the unique constraint.
    let duplicate =
        bazar_db::insert_brand(&mut conn, Uuid::new_v4(), "Farmary", None, now).await;
    match duplicate {
        Err(bazar_db::DbError::Sqlx(e)) => {
            assert_eq!(
                bazar_db::unique_constraint(&e).as_deref(),
                Some("unique_brand_name")
            );
        }
        other => panic!("expected a unique violation, got: {other:?}"),
    }

    // After soft deletion the name is free again.
    let removed = bazar_db::soft_delete_brand(&mut conn, first.guid, now + Duration::seconds(1))
        .await
        .expect("soft delete");
    assert_eq!(removed, 1);

    bazar_db::insert_brand(&mut conn, Uuid::new_v4(), "Farmary", None, now)
        .await
        .expect("tombstone must not block a new live brand");
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_conflict_field_names_the_offender(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut conn = pool.acquire().await.expect("acquire");

    let category = bazar_db::insert_category(&mut conn, Uuid::new_v4(), "Vegetables", "Warzywa", now)
        .await
        .expect("category");
    let brand = bazar_db::insert_brand(&mut conn, Uuid::new_v4(), "Farmary", None, now)
        .await
        .expect("brand");

    let row = new_product_row("2,51,594", "Chinese Cabbage", category.guid, brand.guid);
    let product = bazar_db::insert_product(&mut conn, Uuid::new_v4(), &row, now)
        .await
        .expect("product");

    let sku_conflict = bazar_db::product_conflict_field(
        &mut conn,
        "2,51,594",
        "Green Chili",
        "Zielone Chili",
        None,
    )
    .await
    .expect("conflict check");
    assert_eq!(sku_conflict.as_deref(), Some("sku"));

    let name_conflict = bazar_db::product_conflict_field(
        &mut conn,
        "3,62,605",
        "Chinese Cabbage",
        "Zielone Chili",
        None,
    )
    .await
    .expect("conflict check");
    assert_eq!(name_conflict.as_deref(), Some("name_en"));

    // The product itself is excluded when updating in place.
    let self_conflict = bazar_db::product_conflict_field(
        &mut conn,
        &row.sku,
        &row.name_en,
        &row.name_pl,
        Some(product.guid),
    )
    .await
    .expect("conflict check");
    assert!(self_conflict.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn replace_product_tags_is_a_replacement_not_a_merge(pool: sqlx::PgPool) {
    let now = Utc::now();
    let mut conn = pool.acquire().await.expect("acquire");

    let category = bazar_db::insert_category(&mut conn, Uuid::new_v4(), "Vegetables", "Warzywa", now)
        .await
        .expect("category");
    let brand = bazar_db::insert_brand(&mut conn, Uuid::new_v4(), "Farmary", None, now)
        .await
        .expect("brand");
    let green = bazar_db::insert_tag(&mut conn, Uuid::new_v4(), "Green", "Zielony", now)
        .await
        .expect("tag");
    let fresh = bazar_db::insert_tag(&mut conn, Uuid::new_v4(), "Fresh", "Świeży", now)
        .await
        .expect("tag");

    let row = new_product_row("2,51,594", "Chinese Cabbage", category.guid, brand.guid);
    let product = bazar_db::insert_product(&mut conn, Uuid::new_v4(), &row, now)
        .await
        .expect("product");

    bazar_db::replace_product_tags(&mut conn, product.guid, &[green.guid])
        .await
        .expect("attach");
    bazar_db::replace_product_tags(&mut conn, product.guid, &[fresh.guid])
        .await
        .expect("replace");

    let tags = bazar_db::list_product_tags(&mut conn, product.guid)
        .await
        .expect("list tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].guid, fresh.guid);

    assert!(bazar_db::live_product_with_tag(&mut conn, fresh.guid)
        .await
        .expect("check"));
    assert!(!bazar_db::live_product_with_tag(&mut conn, green.guid)
        .await
        .expect("check"));
}
