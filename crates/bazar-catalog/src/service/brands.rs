//! Brand operations. Brands produce no inbox events of their own; their
//! values reach the read model through product snapshots.

use uuid::Uuid;

use crate::dto::{BrandItem, NewBrand, Page};
use crate::CatalogError;

use super::{map_db_error, page_limits, pages_count, CatalogService};

impl CatalogService {
    /// Creates a brand.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for field violations,
    /// [`CatalogError::AlreadyExists`] when a live brand holds the name,
    /// [`CatalogError::Db`] for storage failures.
    pub async fn add_brand(&self, dto: &NewBrand) -> Result<BrandItem, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::brand_name_exists(&mut tx, &dto.name).await? {
            return Err(CatalogError::AlreadyExists {
                entity: "brand",
                field: "name".to_string(),
            });
        }

        let row = bazar_db::insert_brand(
            &mut tx,
            Uuid::new_v4(),
            &dto.name,
            dto.logo_url.as_deref(),
            now,
        )
        .await
        .map_err(map_db_error)?;

        tx.commit().await?;
        Ok(BrandItem::from(row))
    }

    /// Rewrites a live brand's name and logo.
    ///
    /// # Errors
    ///
    /// As [`CatalogService::add_brand`], plus [`CatalogError::NotFound`]
    /// when the brand is absent or removed.
    pub async fn update_brand(&self, guid: Uuid, dto: &NewBrand) -> Result<BrandItem, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        let updated =
            bazar_db::update_brand_row(&mut tx, guid, &dto.name, dto.logo_url.as_deref(), now)
                .await
                .map_err(map_db_error)?;
        if updated == 0 {
            return Err(CatalogError::NotFound {
                entity: "brand",
                guid,
            });
        }

        let row = bazar_db::get_live_brand(&mut tx, guid)
            .await?
            .ok_or(CatalogError::Db(bazar_db::DbError::NotFound))?;

        tx.commit().await?;
        Ok(BrandItem::from(row))
    }

    /// Soft-deletes a brand, refusing while live products reference it.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] when the brand is absent or removed,
    /// [`CatalogError::InUse`] when a live product references it,
    /// [`CatalogError::Db`] for storage failures.
    pub async fn remove_brand(&self, guid: Uuid) -> Result<(), CatalogError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::get_live_brand(&mut tx, guid).await?.is_none() {
            return Err(CatalogError::NotFound {
                entity: "brand",
                guid,
            });
        }
        if bazar_db::live_product_references_brand(&mut tx, guid).await? {
            return Err(CatalogError::InUse { entity: "brand" });
        }

        bazar_db::soft_delete_brand(&mut tx, guid, now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// One page of live brands.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Db`] for storage failures.
    pub async fn get_brands_list(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<BrandItem>, CatalogError> {
        let (limit, offset) = page_limits(page_number, page_size);
        let rows = bazar_db::list_live_brands(self.pool(), limit, offset).await?;
        let total = bazar_db::live_brand_count(self.pool()).await?;

        Ok(Page {
            page_number,
            page_size: page_size.clamp(1, super::MAX_PAGE_SIZE),
            pages_count: pages_count(total, page_size),
            items: rows.into_iter().map(BrandItem::from).collect(),
        })
    }
}
