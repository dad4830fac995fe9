//! Write-side orchestrator for the catalog.
//!
//! Every mutating operation follows the same contract: validate, mutate the
//! relational rows and append the projection event to the inbox in one
//! transaction, then hand the committed event to the task dispatcher. A
//! failed dispatch is not an error: the event stays pending and the sweeper
//! replays it.

pub mod dto;
pub mod payload;
pub mod service;

pub use dto::{
    BrandItem, CategoryItem, NewBrand, NewCategory, NewProduct, NewTag, Page, ProductDetail,
    ProductListItem, TagItem,
};
pub use payload::build_product_document;
pub use service::CatalogService;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{field} {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{entity} with this {field} already exists")]
    AlreadyExists {
        entity: &'static str,
        field: String,
    },

    #[error("not all requested tags were found")]
    TagsNotFound,

    #[error("{entity} {guid} not found")]
    ReferenceNotFound { entity: &'static str, guid: Uuid },

    #[error("{entity} {guid} not found")]
    NotFound { entity: &'static str, guid: Uuid },

    #[error("cannot remove {entity} having existing products")]
    InUse { entity: &'static str },

    #[error(transparent)]
    Db(#[from] bazar_db::DbError),

    #[error("failed to encode projection payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::Db(bazar_db::DbError::Sqlx(e))
    }
}
