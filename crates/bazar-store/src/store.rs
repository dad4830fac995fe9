//! Document-store gateway: JSON put/get/delete under `product:` keys.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::document::{product_key, ProductDocument};
use crate::StoreError;

/// Capability handed to projection workers.
///
/// Writes are whole-document replaces; there are no partial merges, which is
/// what makes re-applying an event after a crash safe.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upserts the document under `product:{guid}`.
    async fn put_product(&self, doc: &ProductDocument) -> Result<(), StoreError>;

    /// Deletes the document under `product:{guid}`. Deleting a missing key
    /// is a success.
    async fn delete_product(&self, guid: Uuid) -> Result<(), StoreError>;

    /// Returns the current document, or `None` when no projection exists.
    async fn get_product(&self, guid: Uuid) -> Result<Option<ProductDocument>, StoreError>;
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

/// RedisJSON-backed document store.
#[derive(Clone)]
pub struct RedisDocumentStore {
    conn: ConnectionManager,
}

impl RedisDocumentStore {
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connects to the document-store Redis instance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] when the connection cannot be opened.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn put_product(&self, doc: &ProductDocument) -> Result<(), StoreError> {
        let key = product_key(doc.guid);
        let body = serde_json::to_string(doc).map_err(|source| StoreError::Decode {
            key: key.clone(),
            source,
        })?;

        let mut conn = self.conn.clone();
        redis::cmd("JSON.SET")
            .arg(&key)
            .arg("$")
            .arg(body)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_product(&self, guid: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // JSON.DEL returns the number of paths deleted; 0 for a missing key,
        // which still counts as success.
        redis::cmd("JSON.DEL")
            .arg(product_key(guid))
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_product(&self, guid: Uuid) -> Result<Option<ProductDocument>, StoreError> {
        let key = product_key(guid);
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(&key)
            .arg("$")
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        // Path queries return an array of matches; `$` yields exactly one.
        let mut docs: Vec<ProductDocument> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Decode { key, source })?;
        Ok(docs.pop())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Hash-map document store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: std::sync::Mutex<std::collections::HashMap<Uuid, ProductDocument>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.lock().expect("store lock poisoned").len()
    }

    /// Whether the store holds no documents.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put_product(&self, doc: &ProductDocument) -> Result<(), StoreError> {
        self.docs
            .lock()
            .expect("store lock poisoned")
            .insert(doc.guid, doc.clone());
        Ok(())
    }

    async fn delete_product(&self, guid: Uuid) -> Result<(), StoreError> {
        self.docs.lock().expect("store lock poisoned").remove(&guid);
        Ok(())
    }

    async fn get_product(&self, guid: Uuid) -> Result<Option<ProductDocument>, StoreError> {
        Ok(self
            .docs
            .lock()
            .expect("store lock poisoned")
            .get(&guid)
            .cloned())
    }
}
