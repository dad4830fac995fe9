//! Read-model side of the catalog: the denormalized product document, the
//! document-store gateway it lives in, and the search service shoppers query.
//!
//! Only projection workers write here; the write-side orchestrator never
//! touches the document store.

pub mod document;
pub mod index;
pub mod search;
pub mod store;

pub use document::{product_key, ProductDocument, ProductRemoval};
pub use index::ensure_index;
pub use search::{OfferFilter, OfferPage, OfferSearch, SearchService};
pub use store::{DocumentStore, MemoryDocumentStore, RedisDocumentStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("unexpected search reply shape: {0}")]
    MalformedReply(String),

    #[error("failed to decode document {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
