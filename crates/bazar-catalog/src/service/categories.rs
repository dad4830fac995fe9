//! Category operations.
//!
//! Update and removal append `CATEGORY_UPDATED` / `CATEGORY_REMOVED` inbox
//! events. No projector consumes them yet, so they are recorded but not
//! dispatched; they stay pending in the inbox for future consumers.

use uuid::Uuid;

use bazar_db::InboxEventType;

use crate::dto::{CategoryItem, NewCategory, Page};
use crate::CatalogError;

use super::{map_db_error, page_limits, pages_count, CatalogService};

impl CatalogService {
    /// Creates a category.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for field violations,
    /// [`CatalogError::AlreadyExists`] when a live category holds either
    /// name, [`CatalogError::Db`] for storage failures.
    pub async fn create_category(&self, dto: &NewCategory) -> Result<CategoryItem, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::category_name_exists(&mut tx, &dto.name_en, &dto.name_pl).await? {
            return Err(CatalogError::AlreadyExists {
                entity: "category",
                field: "name".to_string(),
            });
        }

        let row =
            bazar_db::insert_category(&mut tx, Uuid::new_v4(), &dto.name_en, &dto.name_pl, now)
                .await
                .map_err(map_db_error)?;

        tx.commit().await?;
        Ok(CategoryItem::from(row))
    }

    /// Rewrites a live category's names.
    ///
    /// # Errors
    ///
    /// As [`CatalogService::create_category`], plus
    /// [`CatalogError::NotFound`] when the category is absent or removed.
    pub async fn update_category(
        &self,
        guid: Uuid,
        dto: &NewCategory,
    ) -> Result<CategoryItem, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        let updated =
            bazar_db::update_category_row(&mut tx, guid, &dto.name_en, &dto.name_pl, now)
                .await
                .map_err(map_db_error)?;
        if updated == 0 {
            return Err(CatalogError::NotFound {
                entity: "category",
                guid,
            });
        }

        let row = bazar_db::get_live_category(&mut tx, guid)
            .await?
            .ok_or(CatalogError::Db(bazar_db::DbError::NotFound))?;

        bazar_db::append_event(
            &mut tx,
            InboxEventType::CategoryUpdated,
            &serde_json::json!({
                "guid": row.guid,
                "name_en": row.name_en,
                "name_pl": row.name_pl,
                "updated_at": row.updated_at,
            }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(CategoryItem::from(row))
    }

    /// Soft-deletes a category, refusing while live products reference it.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] when the category is absent or removed,
    /// [`CatalogError::InUse`] when a live product references it,
    /// [`CatalogError::Db`] for storage failures.
    pub async fn remove_category(&self, guid: Uuid) -> Result<(), CatalogError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::live_product_references_category(&mut tx, guid).await? {
            return Err(CatalogError::InUse { entity: "category" });
        }

        let removed = bazar_db::soft_delete_category(&mut tx, guid, now).await?;
        if removed == 0 {
            return Err(CatalogError::NotFound {
                entity: "category",
                guid,
            });
        }

        bazar_db::append_event(
            &mut tx,
            InboxEventType::CategoryRemoved,
            &serde_json::json!({ "guid": guid, "removed_at": now }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// One page of live categories.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Db`] for storage failures.
    pub async fn get_category_list(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<CategoryItem>, CatalogError> {
        let (limit, offset) = page_limits(page_number, page_size);
        let rows = bazar_db::list_live_categories(self.pool(), limit, offset).await?;
        let total = bazar_db::live_category_count(self.pool()).await?;

        Ok(Page {
            page_number,
            page_size: page_size.clamp(1, super::MAX_PAGE_SIZE),
            pages_count: pages_count(total, page_size),
            items: rows.into_iter().map(CategoryItem::from).collect(),
        })
    }
}
