//! `CatalogService` and the helpers shared by every entity's operations.

mod brands;
mod categories;
mod products;
mod tags;

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use bazar_core::Clock;
use bazar_db::DbError;
use bazar_tasks::{TaskDispatcher, TaskKind};

use crate::CatalogError;

/// Largest accepted `page_size` on write-side listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Write-side orchestrator over the relational store.
///
/// Collaborators are injected capabilities: the clock supplies every
/// timestamp and the dispatcher hands committed inbox events to the broker.
pub struct CatalogService {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl CatalogService {
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
        Self {
            pool,
            clock,
            dispatcher,
        }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Hands a committed event to the broker.
    ///
    /// Failure is deliberately swallowed: the write has committed, the event
    /// is durable in the inbox, and the sweeper will replay it. The caller
    /// still reports success.
    pub(crate) async fn dispatch_committed(&self, kind: TaskKind, event_guid: Uuid) {
        if let Err(e) = self.dispatcher.enqueue(kind, event_guid).await {
            tracing::warn!(
                error = %e,
                queue = kind.queue(),
                event = %event_guid,
                "dispatch failed; event stays pending for the sweeper"
            );
        }
    }
}

/// `(limit, offset)` for a page request, with `page_size` clamped to
/// `1..=MAX_PAGE_SIZE`.
pub(crate) fn page_limits(page_number: u32, page_size: u32) -> (i64, i64) {
    let size = i64::from(page_size.clamp(1, MAX_PAGE_SIZE));
    (size, i64::from(page_number) * size)
}

/// `ceil(total / page_size)` for write-side listings.
pub(crate) fn pages_count(total: i64, page_size: u32) -> u32 {
    let size = i64::from(page_size.clamp(1, MAX_PAGE_SIZE));
    let total_u64 = u64::try_from(total).unwrap_or(0);
    let size_u64 = u64::try_from(size).unwrap_or(1);
    u32::try_from(total_u64.div_ceil(size_u64)).unwrap_or(u32::MAX)
}

/// Entity and field behind a named unique constraint.
fn conflict_from_constraint(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "unique_brand_name" => Some(("brand", "name")),
        "unique_category_name_en" => Some(("category", "name_en")),
        "unique_category_name_pl" => Some(("category", "name_pl")),
        "unique_tag_en" => Some(("tag", "en")),
        "unique_tag_pl" => Some(("tag", "pl")),
        "unique_product_sku" => Some(("product", "sku")),
        "unique_product_name_en" => Some(("product", "name_en")),
        "unique_product_name_pl" => Some(("product", "name_pl")),
        _ => None,
    }
}

/// Translates a unique violation into the conflict it represents; anything
/// else passes through as a storage error.
///
/// The read-then-check courtesy queries usually catch conflicts first with a
/// nicer message; this is the backstop for the race they cannot close.
pub(crate) fn map_db_error(e: DbError) -> CatalogError {
    if let DbError::Sqlx(sqlx_err) = &e {
        if let Some(constraint) = bazar_db::unique_constraint(sqlx_err) {
            if let Some((entity, field)) = conflict_from_constraint(&constraint) {
                return CatalogError::AlreadyExists {
                    entity,
                    field: field.to_string(),
                };
            }
        }
    }
    CatalogError::Db(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limits_clamp_page_size() {
        assert_eq!(page_limits(0, 0), (1, 0));
        assert_eq!(page_limits(0, 10), (10, 0));
        assert_eq!(page_limits(3, 10), (10, 30));
        assert_eq!(page_limits(1, 1_000), (100, 100));
    }

    #[test]
    fn pages_count_rounds_up() {
        assert_eq!(pages_count(0, 10), 0);
        assert_eq!(pages_count(9, 10), 1);
        assert_eq!(pages_count(10, 10), 1);
        assert_eq!(pages_count(11, 10), 2);
    }

    #[test]
    fn product_constraints_map_to_their_fields() {
        assert_eq!(
            conflict_from_constraint("unique_product_sku"),
            Some(("product", "sku"))
        );
        assert_eq!(
            conflict_from_constraint("unique_product_name_pl"),
            Some(("product", "name_pl"))
        );
        assert_eq!(conflict_from_constraint("products_pkey"), None);
    }
}
