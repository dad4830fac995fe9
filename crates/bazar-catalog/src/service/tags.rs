//! Tag operations. Removal appends a `TAG_REMOVED` inbox event, recorded
//! but unconsumed for now.

use uuid::Uuid;

use bazar_db::InboxEventType;

use crate::dto::{NewTag, Page, TagItem};
use crate::CatalogError;

use super::{map_db_error, page_limits, pages_count, CatalogService};

impl CatalogService {
    /// Creates a tag.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for field violations,
    /// [`CatalogError::AlreadyExists`] when a live tag holds either label,
    /// [`CatalogError::Db`] for storage failures.
    pub async fn add_tag(&self, dto: &NewTag) -> Result<TagItem, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::tag_exists(&mut tx, &dto.en, &dto.pl).await? {
            return Err(CatalogError::AlreadyExists {
                entity: "tag",
                field: "tag".to_string(),
            });
        }

        let row = bazar_db::insert_tag(&mut tx, Uuid::new_v4(), &dto.en, &dto.pl, now)
            .await
            .map_err(map_db_error)?;

        tx.commit().await?;
        Ok(TagItem::from(row))
    }

    /// Soft-deletes a tag, refusing while live products carry it.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] when the tag is absent or removed,
    /// [`CatalogError::InUse`] when a live product carries it,
    /// [`CatalogError::Db`] for storage failures.
    pub async fn remove_tag(&self, guid: Uuid) -> Result<(), CatalogError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::get_live_tag(&mut tx, guid).await?.is_none() {
            return Err(CatalogError::NotFound {
                entity: "tag",
                guid,
            });
        }
        if bazar_db::live_product_with_tag(&mut tx, guid).await? {
            return Err(CatalogError::InUse { entity: "tag" });
        }

        bazar_db::soft_delete_tag(&mut tx, guid, now).await?;

        bazar_db::append_event(
            &mut tx,
            InboxEventType::TagRemoved,
            &serde_json::json!({ "guid": guid, "removed_at": now }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// One page of live tags.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Db`] for storage failures.
    pub async fn get_tags_list(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<TagItem>, CatalogError> {
        let (limit, offset) = page_limits(page_number, page_size);
        let rows = bazar_db::list_live_tags(self.pool(), limit, offset).await?;
        let total = bazar_db::live_tag_count(self.pool()).await?;

        Ok(Page {
            page_number,
            page_size: page_size.clamp(1, super::MAX_PAGE_SIZE),
            pages_count: pages_count(total, page_size),
            items: rows.into_iter().map(TagItem::from).collect(),
        })
    }
}
