//! Write-orchestrator integration tests: uniqueness, referential integrity,
//! inbox atomicity, and the full write-to-read-model round trip through the
//! in-memory broker.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use bazar_catalog::{CatalogError, CatalogService, NewBrand, NewCategory, NewProduct, NewTag};
use bazar_core::FixedClock;
use bazar_db::InboxEventType;
use bazar_store::{DocumentStore, MemoryDocumentStore};
use bazar_tasks::{InMemoryBroker, Projector, TaskDispatcher, TaskError, TaskKind};

// ---------------------------------------------------------------------------
// Test doubles and fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingDispatcher {
    calls: Mutex<Vec<(TaskKind, Uuid)>>,
}

impl RecordingDispatcher {
    fn calls(&self) -> Vec<(TaskKind, Uuid)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait::async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn enqueue(&self, kind: TaskKind, event_guid: Uuid) -> Result<(), TaskError> {
        self.calls.lock().expect("lock").push((kind, event_guid));
        Ok(())
    }
}

/// Dispatcher standing in for an unreachable broker.
struct FailingDispatcher;

#[async_trait::async_trait]
impl TaskDispatcher for FailingDispatcher {
    async fn enqueue(&self, _kind: TaskKind, _event_guid: Uuid) -> Result<(), TaskError> {
        Err(TaskError::ChannelClosed)
    }
}

struct Harness {
    service: CatalogService,
    clock: Arc<FixedClock>,
}

fn harness(pool: sqlx::PgPool, dispatcher: Arc<dyn TaskDispatcher>) -> Harness {
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let service = CatalogService::new(pool, Arc::<FixedClock>::clone(&clock), dispatcher);
    Harness { service, clock }
}

fn tag_green() -> NewTag {
    NewTag {
        en: "Vegetables".to_string(),
        pl: "Warzywa".to_string(),
    }
}

fn category_vegetables() -> NewCategory {
    NewCategory {
        name_en: "Vegetables".to_string(),
        name_pl: "Warzywa".to_string(),
    }
}

fn brand_farmary() -> NewBrand {
    NewBrand {
        name: "Farmary".to_string(),
        logo_url: Some("https://s3.eu-central-1.amazonaws.com/bucket/file".to_string()),
    }
}

fn chinese_cabbage(tags: Vec<Uuid>, category: Uuid, brand: Uuid) -> NewProduct {
    NewProduct {
        sku: "2,51,594".to_string(),
        name_en: "Chinese Cabbage".to_string(),
        name_pl: "Kapusta Chińska".to_string(),
        image_url: Some("https://s3.eu-central-1.amazonaws.com/bucket/file".to_string()),
        description_en: "Sed commodo aliquam dui ac porta.".to_string(),
        description_pl: "Sed commodo aliquam dui ac porta.".to_string(),
        base_price_usd: Decimal::from_str("48.00").unwrap(),
        base_price_pln: Decimal::from_str("194.43").unwrap(),
        discount: Some(64),
        quantity: Decimal::from_str("5413").unwrap(),
        weight: 3,
        color_en: "Green".to_string(),
        color_pl: "Zielony".to_string(),
        tags_guids: tags,
        category_guid: category,
        brand_guid: brand,
    }
}

fn green_chili(tags: Vec<Uuid>, category: Uuid, brand: Uuid) -> NewProduct {
    NewProduct {
        sku: "9,99,901".to_string(),
        name_en: "Green Chili".to_string(),
        name_pl: "Zielone Chili".to_string(),
        image_url: None,
        description_en: "Spicy.".to_string(),
        description_pl: "Ostre.".to_string(),
        base_price_usd: Decimal::from_str("10.00").unwrap(),
        base_price_pln: Decimal::from_str("40.50").unwrap(),
        discount: Some(10),
        quantity: Decimal::ONE,
        weight: 1,
        color_en: "Green".to_string(),
        color_pl: "Zielony".to_string(),
        tags_guids: tags,
        category_guid: category,
        brand_guid: brand,
    }
}

/// Every inbox event still pending, regardless of kind or age.
async fn pending_events(pool: &sqlx::PgPool) -> Vec<bazar_db::InboxEventRow> {
    bazar_db::list_stale_pending(
        pool,
        Utc::now() + Duration::days(1),
        &[
            InboxEventType::ProductUpdated,
            InboxEventType::ProductRemoved,
            InboxEventType::CategoryUpdated,
            InboxEventType::CategoryRemoved,
            InboxEventType::TagRemoved,
        ],
        100,
    )
    .await
    .expect("list pending")
}

/// Creates the standard tag + category + brand trio and returns their guids.
async fn seed_references(service: &CatalogService) -> (Uuid, Uuid, Uuid) {
    let tag = service.add_tag(&tag_green()).await.expect("tag");
    let category = service
        .create_category(&category_vegetables())
        .await
        .expect("category");
    let brand = service.add_brand(&brand_farmary()).await.expect("brand");
    (tag.guid, category.guid, brand.guid)
}

// ---------------------------------------------------------------------------
// Product writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn add_product_returns_details_and_commits_one_event(pool: sqlx::PgPool) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let h = harness(pool.clone(), Arc::clone(&dispatcher) as Arc<dyn TaskDispatcher>);
    let (tag, category, brand) = seed_references(&h.service).await;

    let detail = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add product");

    assert_eq!(detail.sku, "2,51,594");
    assert_eq!(
        detail.discounted_price_usd,
        Decimal::from_str("17.28").unwrap()
    );
    assert_eq!(detail.brand.name, "Farmary");
    assert_eq!(detail.category.name_en, "Vegetables");
    assert_eq!(detail.tags.len(), 1);

    // The business row and the inbox event committed together.
    let events = pending_events(&pool).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind(), Some(InboxEventType::ProductUpdated));
    assert_eq!(event.data["sku"], serde_json::json!("2,51,594"));
    assert_eq!(event.data["brand_name"], serde_json::json!("Farmary"));

    // The committed event id went to the broker.
    assert_eq!(dispatcher.calls(), vec![(TaskKind::ProductUpdated, event.guid)]);

    let fetched = h
        .service
        .get_product_details(detail.guid)
        .await
        .expect("details")
        .expect("product should be live");
    assert_eq!(fetched.sku, detail.sku);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_sku_is_rejected_without_an_event(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    h.service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("first product");

    let mut duplicate = green_chili(vec![tag], category, brand);
    duplicate.sku = "2,51,594".to_string();
    let err = h
        .service
        .add_product(&duplicate)
        .await
        .expect_err("same sku must be rejected");

    assert!(
        matches!(&err, CatalogError::AlreadyExists { field, .. } if field == "sku"),
        "unexpected error: {err:?}"
    );
    assert!(err.to_string().contains("sku"));

    // The rejected write left no trace in the inbox.
    assert_eq!(pending_events(&pool).await.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_name_is_rejected(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    h.service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("first product");

    let mut duplicate = green_chili(vec![tag], category, brand);
    duplicate.name_en = "Chinese Cabbage".to_string();
    let err = h
        .service
        .add_product(&duplicate)
        .await
        .expect_err("same name must be rejected");

    assert!(
        matches!(&err, CatalogError::AlreadyExists { field, .. } if field == "name_en"),
        "unexpected error: {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_tag_reference_is_rejected(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (_tag, category, brand) = seed_references(&h.service).await;

    let err = h
        .service
        .add_product(&chinese_cabbage(vec![Uuid::new_v4()], category, brand))
        .await
        .expect_err("unknown tag must be rejected");

    assert!(matches!(err, CatalogError::TagsNotFound));
    assert!(pending_events(&pool).await.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_category_and_brand_references_are_rejected(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    let missing_category = h
        .service
        .add_product(&chinese_cabbage(vec![tag], Uuid::new_v4(), brand))
        .await
        .expect_err("unknown category");
    assert!(matches!(
        missing_category,
        CatalogError::ReferenceNotFound {
            entity: "category",
            ..
        }
    ));

    let missing_brand = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, Uuid::new_v4()))
        .await
        .expect_err("unknown brand");
    assert!(matches!(
        missing_brand,
        CatalogError::ReferenceNotFound {
            entity: "brand",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_product_replaces_attributes_and_appends_a_fresh_event(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    let created = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add");

    h.clock.advance(Duration::seconds(5));
    let mut updated_dto = chinese_cabbage(vec![tag], category, brand);
    updated_dto.sku = "3,62,605".to_string();
    let updated = h
        .service
        .update_product(created.guid, &updated_dto)
        .await
        .expect("update");

    assert_eq!(updated.sku, "3,62,605");
    assert!(updated.updated_at > created.updated_at);

    let fetched = h
        .service
        .get_product_details(created.guid)
        .await
        .expect("details")
        .expect("live");
    assert_eq!(fetched.sku, "3,62,605");

    let events = pending_events(&pool).await;
    assert_eq!(events.len(), 2, "one event per write");
    assert_eq!(events[1].data["sku"], serde_json::json!("3,62,605"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_of_a_missing_product_is_not_found(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    let err = h
        .service
        .update_product(Uuid::new_v4(), &chinese_cabbage(vec![tag], category, brand))
        .await
        .expect_err("missing product");
    assert!(matches!(
        err,
        CatalogError::NotFound {
            entity: "product",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn remove_product_hides_it_and_appends_a_removal_event(pool: sqlx::PgPool) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let h = harness(pool.clone(), Arc::clone(&dispatcher) as Arc<dyn TaskDispatcher>);
    let (tag, category, brand) = seed_references(&h.service).await;

    let created = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add");

    h.clock.advance(Duration::seconds(5));
    h.service
        .remove_product(created.guid)
        .await
        .expect("remove");

    assert!(h
        .service
        .get_product_details(created.guid)
        .await
        .expect("details")
        .is_none());

    let events = pending_events(&pool).await;
    assert_eq!(events.len(), 2);
    let removal = &events[1];
    assert_eq!(removal.kind(), Some(InboxEventType::ProductRemoved));
    assert_eq!(
        removal.data["guid"],
        serde_json::json!(created.guid.to_string())
    );
    assert_eq!(
        dispatcher.calls().last(),
        Some(&(TaskKind::ProductRemoved, removal.guid))
    );

    let err = h
        .service
        .remove_product(created.guid)
        .await
        .expect_err("double removal");
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn broker_failure_still_commits_the_write(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(FailingDispatcher));
    let (tag, category, brand) = seed_references(&h.service).await;

    // The dispatcher is down; the write must succeed regardless.
    let detail = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add product with dead broker");

    assert!(h
        .service
        .get_product_details(detail.guid)
        .await
        .expect("details")
        .is_some());

    // The event sits in the inbox for the sweeper.
    let events = pending_events(&pool).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), Some(InboxEventType::ProductUpdated));
}

// ---------------------------------------------------------------------------
// Referential integrity and soft-delete reuse
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn referenced_brand_category_and_tag_cannot_be_removed(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));
    let (tag, category, brand) = seed_references(&h.service).await;

    let product = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add");

    assert!(matches!(
        h.service.remove_brand(brand).await.expect_err("in use"),
        CatalogError::InUse { entity: "brand" }
    ));
    assert!(matches!(
        h.service
            .remove_category(category)
            .await
            .expect_err("in use"),
        CatalogError::InUse { entity: "category" }
    ));
    assert!(matches!(
        h.service.remove_tag(tag).await.expect_err("in use"),
        CatalogError::InUse { entity: "tag" }
    ));

    // Once the product is gone the references are free.
    h.clock.advance(Duration::seconds(1));
    h.service.remove_product(product.guid).await.expect("remove");
    h.service.remove_brand(brand).await.expect("brand free");
    h.service
        .remove_category(category)
        .await
        .expect("category free");
    h.service.remove_tag(tag).await.expect("tag free");
}

#[sqlx::test(migrations = "../../migrations")]
async fn soft_deleted_brand_name_can_be_reused(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));

    let first = h.service.add_brand(&brand_farmary()).await.expect("add");

    let duplicate = h
        .service
        .add_brand(&brand_farmary())
        .await
        .expect_err("live duplicate");
    assert!(matches!(
        duplicate,
        CatalogError::AlreadyExists { entity: "brand", .. }
    ));

    h.clock.advance(Duration::seconds(1));
    h.service.remove_brand(first.guid).await.expect("remove");
    h.service
        .add_brand(&brand_farmary())
        .await
        .expect("tombstone frees the name");
}

#[sqlx::test(migrations = "../../migrations")]
async fn category_update_records_an_undispatched_event(pool: sqlx::PgPool) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let h = harness(pool.clone(), Arc::clone(&dispatcher) as Arc<dyn TaskDispatcher>);

    let category = h
        .service
        .create_category(&category_vegetables())
        .await
        .expect("create");

    h.clock.advance(Duration::seconds(1));
    let renamed = NewCategory {
        name_en: "Greens".to_string(),
        name_pl: "Zielenina".to_string(),
    };
    h.service
        .update_category(category.guid, &renamed)
        .await
        .expect("update");

    let events = pending_events(&pool).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), Some(InboxEventType::CategoryUpdated));
    // Reserved event kinds are recorded but never dispatched.
    assert!(dispatcher.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tag_listing_paginates_with_a_rounded_up_page_count(pool: sqlx::PgPool) {
    let h = harness(pool.clone(), Arc::new(RecordingDispatcher::default()));

    for (en, pl) in [("Green", "Zielony"), ("Fresh", "Świeży"), ("Crisp", "Chrupiący")] {
        h.clock.advance(Duration::seconds(1));
        h.service
            .add_tag(&NewTag {
                en: en.to_string(),
                pl: pl.to_string(),
            })
            .await
            .expect("tag");
    }

    let first_page = h.service.get_tags_list(0, 2).await.expect("page 0");
    assert_eq!(first_page.items.len(), 2);
    assert_eq!(first_page.pages_count, 2);
    assert_eq!(first_page.page_size, 2);

    let second_page = h.service.get_tags_list(1, 2).await.expect("page 1");
    assert_eq!(second_page.items.len(), 1);
}

// ---------------------------------------------------------------------------
// Write model to read model, end to end
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn committed_writes_eventually_reach_the_document_store(pool: sqlx::PgPool) {
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(pool.clone(), Arc::clone(&broker) as Arc<dyn TaskDispatcher>);
    let projector = Projector::new(
        pool.clone(),
        Arc::<MemoryDocumentStore>::clone(&store),
        Arc::new(FixedClock::new(Utc::now())),
    );
    let (tag, category, brand) = seed_references(&h.service).await;

    // Create: the document appears with the precomputed discount.
    let created = h
        .service
        .add_product(&chinese_cabbage(vec![tag], category, brand))
        .await
        .expect("add");
    broker.drain(&projector).await.expect("drain");

    let doc = store
        .get_product(created.guid)
        .await
        .expect("get")
        .expect("projected");
    assert_eq!(doc.sku, "2,51,594");
    assert_eq!(doc.discounted_price_usd, Decimal::from_str("17.28").unwrap());
    assert_eq!(doc.tags_en, vec!["Vegetables"]);
    assert_eq!(doc.brand_name, "Farmary");

    // Update: the document is replaced wholesale.
    h.clock.advance(Duration::seconds(5));
    let mut updated_dto = chinese_cabbage(vec![tag], category, brand);
    updated_dto.sku = "3,62,605".to_string();
    h.service
        .update_product(created.guid, &updated_dto)
        .await
        .expect("update");
    broker.drain(&projector).await.expect("drain");

    let doc = store
        .get_product(created.guid)
        .await
        .expect("get")
        .expect("projected");
    assert_eq!(doc.sku, "3,62,605");

    // Remove: the document disappears.
    h.clock.advance(Duration::seconds(5));
    h.service.remove_product(created.guid).await.expect("remove");
    broker.drain(&projector).await.expect("drain");

    assert!(store.get_product(created.guid).await.expect("get").is_none());

    // Nothing consumable is left pending.
    let leftovers: Vec<_> = pending_events(&pool)
        .await
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind(),
                Some(InboxEventType::ProductUpdated | InboxEventType::ProductRemoved)
            )
        })
        .collect();
    assert!(leftovers.is_empty());
}
