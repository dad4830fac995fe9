//! Product operations: the full inbox-pattern write path.

use uuid::Uuid;

use bazar_db::{InboxEventType, NewProductRow};
use bazar_tasks::TaskKind;
use bazar_store::ProductRemoval;

use crate::dto::{NewProduct, Page, ProductDetail, ProductListItem};
use crate::payload::build_product_document;
use crate::CatalogError;

use super::{map_db_error, page_limits, pages_count, CatalogService};

fn product_row_values(dto: &NewProduct) -> NewProductRow {
    NewProductRow {
        sku: dto.sku.clone(),
        name_en: dto.name_en.clone(),
        name_pl: dto.name_pl.clone(),
        image_url: dto.image_url.clone(),
        description_en: dto.description_en.clone(),
        description_pl: dto.description_pl.clone(),
        base_price_usd: dto.base_price_usd,
        base_price_pln: dto.base_price_pln,
        discount: dto.discount,
        quantity: dto.quantity,
        weight: dto.weight,
        color_en: dto.color_en.clone(),
        color_pl: dto.color_pl.clone(),
        category_guid: dto.category_guid,
        brand_guid: dto.brand_guid,
    }
}

impl CatalogService {
    /// Creates a product and commits its projection event atomically.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for field violations,
    /// [`CatalogError::AlreadyExists`] when the sku or either name is taken
    /// by a live product, [`CatalogError::TagsNotFound`] /
    /// [`CatalogError::ReferenceNotFound`] for dangling references, and
    /// [`CatalogError::Db`] for storage failures.
    pub async fn add_product(&self, dto: &NewProduct) -> Result<ProductDetail, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if let Some(field) = bazar_db::product_conflict_field(
            &mut tx,
            &dto.sku,
            &dto.name_en,
            &dto.name_pl,
            None,
        )
        .await?
        {
            return Err(CatalogError::AlreadyExists {
                entity: "product",
                field,
            });
        }

        let tag_guids = dto.unique_tag_guids();
        let tags = bazar_db::get_live_tags_by_guids(&mut tx, &tag_guids).await?;
        if tags.len() < tag_guids.len() {
            return Err(CatalogError::TagsNotFound);
        }
        let category = bazar_db::get_live_category(&mut tx, dto.category_guid)
            .await?
            .ok_or(CatalogError::ReferenceNotFound {
                entity: "category",
                guid: dto.category_guid,
            })?;
        let brand = bazar_db::get_live_brand(&mut tx, dto.brand_guid)
            .await?
            .ok_or(CatalogError::ReferenceNotFound {
                entity: "brand",
                guid: dto.brand_guid,
            })?;

        let row = bazar_db::insert_product(&mut tx, Uuid::new_v4(), &product_row_values(dto), now)
            .await
            .map_err(map_db_error)?;
        bazar_db::replace_product_tags(&mut tx, row.guid, &tag_guids).await?;

        let document = build_product_document(&row, &tags, &category, &brand);
        let event_guid = bazar_db::append_event(
            &mut tx,
            InboxEventType::ProductUpdated,
            &serde_json::to_value(&document)?,
            now,
        )
        .await?;

        tx.commit().await?;
        self.dispatch_committed(TaskKind::ProductUpdated, event_guid)
            .await;

        Ok(ProductDetail::assemble(row, tags, category, brand))
    }

    /// Rewrites a live product; the tag set is replaced, not merged.
    ///
    /// # Errors
    ///
    /// As [`CatalogService::add_product`], plus [`CatalogError::NotFound`]
    /// when the product is absent or removed.
    pub async fn update_product(
        &self,
        guid: Uuid,
        dto: &NewProduct,
    ) -> Result<ProductDetail, CatalogError> {
        dto.validate()?;
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        if bazar_db::get_live_product(&mut tx, guid).await?.is_none() {
            return Err(CatalogError::NotFound {
                entity: "product",
                guid,
            });
        }

        if let Some(field) = bazar_db::product_conflict_field(
            &mut tx,
            &dto.sku,
            &dto.name_en,
            &dto.name_pl,
            Some(guid),
        )
        .await?
        {
            return Err(CatalogError::AlreadyExists {
                entity: "product",
                field,
            });
        }

        let tag_guids = dto.unique_tag_guids();
        let tags = bazar_db::get_live_tags_by_guids(&mut tx, &tag_guids).await?;
        if tags.len() < tag_guids.len() {
            return Err(CatalogError::TagsNotFound);
        }
        let category = bazar_db::get_live_category(&mut tx, dto.category_guid)
            .await?
            .ok_or(CatalogError::ReferenceNotFound {
                entity: "category",
                guid: dto.category_guid,
            })?;
        let brand = bazar_db::get_live_brand(&mut tx, dto.brand_guid)
            .await?
            .ok_or(CatalogError::ReferenceNotFound {
                entity: "brand",
                guid: dto.brand_guid,
            })?;

        let row = bazar_db::update_product_row(&mut tx, guid, &product_row_values(dto), now)
            .await
            .map_err(map_db_error)?
            .ok_or(CatalogError::NotFound {
                entity: "product",
                guid,
            })?;
        bazar_db::replace_product_tags(&mut tx, guid, &tag_guids).await?;

        let document = build_product_document(&row, &tags, &category, &brand);
        let event_guid = bazar_db::append_event(
            &mut tx,
            InboxEventType::ProductUpdated,
            &serde_json::to_value(&document)?,
            now,
        )
        .await?;

        tx.commit().await?;
        self.dispatch_committed(TaskKind::ProductUpdated, event_guid)
            .await;

        Ok(ProductDetail::assemble(row, tags, category, brand))
    }

    /// Soft-deletes a product and commits its removal event atomically.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] when the product is absent or already
    /// removed, [`CatalogError::Db`] for storage failures.
    pub async fn remove_product(&self, guid: Uuid) -> Result<(), CatalogError> {
        let now = self.now();
        let mut tx = self.pool().begin().await?;

        let removed = bazar_db::soft_delete_product(&mut tx, guid, now).await?;
        if removed == 0 {
            return Err(CatalogError::NotFound {
                entity: "product",
                guid,
            });
        }

        let removal = ProductRemoval {
            guid,
            updated_at: now,
        };
        let event_guid = bazar_db::append_event(
            &mut tx,
            InboxEventType::ProductRemoved,
            &serde_json::to_value(&removal)?,
            now,
        )
        .await?;

        tx.commit().await?;
        self.dispatch_committed(TaskKind::ProductRemoved, event_guid)
            .await;

        Ok(())
    }

    /// Full product view with resolved tags, category, and brand, or `None`
    /// when the product is absent or removed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Db`] for storage failures.
    pub async fn get_product_details(
        &self,
        guid: Uuid,
    ) -> Result<Option<ProductDetail>, CatalogError> {
        let mut conn = self.pool().acquire().await?;

        let Some(product) = bazar_db::get_live_product(&mut conn, guid).await? else {
            return Ok(None);
        };
        let tags = bazar_db::list_product_tags(&mut conn, guid).await?;
        let category = bazar_db::get_live_category(&mut conn, product.category_guid)
            .await?
            .ok_or(CatalogError::Db(bazar_db::DbError::NotFound))?;
        let brand = bazar_db::get_live_brand(&mut conn, product.brand_guid)
            .await?
            .ok_or(CatalogError::Db(bazar_db::DbError::NotFound))?;

        Ok(Some(ProductDetail::assemble(product, tags, category, brand)))
    }

    /// One page of live products.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Db`] for storage failures.
    pub async fn get_product_list(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<ProductListItem>, CatalogError> {
        let (limit, offset) = page_limits(page_number, page_size);
        let rows = bazar_db::list_live_products(self.pool(), limit, offset).await?;
        let total = bazar_db::live_product_count(self.pool()).await?;

        Ok(Page {
            page_number,
            page_size: page_size.clamp(1, super::MAX_PAGE_SIZE),
            pages_count: pages_count(total, page_size),
            items: rows.into_iter().map(ProductListItem::from).collect(),
        })
    }
}
