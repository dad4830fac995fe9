//! Paginated search over the `idx:products` index, the shopper read path.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use rust_decimal::Decimal;

use crate::document::ProductDocument;
use crate::index::INDEX_NAME;
use crate::StoreError;

/// Largest accepted `page_size`; anything above is clamped down.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Structured predicate over the indexed fields.
#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    /// Full-text match against names and descriptions, both languages.
    pub text: Option<String>,
    /// Exact category name, either language.
    pub category: Option<String>,
    /// Exact brand name.
    pub brand: Option<String>,
    /// Exact tag, either language.
    pub tag: Option<String>,
    /// Inclusive lower bound on `discounted_price_usd`.
    pub price_min: Option<Decimal>,
    /// Inclusive upper bound on `discounted_price_usd`.
    pub price_max: Option<Decimal>,
}

impl OfferFilter {
    fn is_text_search(&self) -> bool {
        self.text
            .as_deref()
            .is_some_and(|t| !sanitize_text(t).is_empty())
    }
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct OfferPage {
    pub page_number: u32,
    pub page_size: u32,
    pub pages_count: u32,
    pub total: u64,
    pub items: Vec<ProductDocument>,
}

/// Capability the HTTP layer queries; implemented by [`SearchService`] and
/// stubbed in router tests.
#[async_trait]
pub trait OfferSearch: Send + Sync {
    async fn search(
        &self,
        page_number: u32,
        page_size: u32,
        filter: &OfferFilter,
    ) -> Result<OfferPage, StoreError>;
}

/// Read-path service over the document-store index.
#[derive(Clone)]
pub struct SearchService {
    conn: ConnectionManager,
}

#[async_trait]
impl OfferSearch for SearchService {
    async fn search(
        &self,
        page_number: u32,
        page_size: u32,
        filter: &OfferFilter,
    ) -> Result<OfferPage, StoreError> {
        SearchService::search(self, page_number, page_size, filter).await
    }
}

impl SearchService {
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Runs a paginated query; results reflect the index at query time.
    ///
    /// `page_size` is clamped into `1..=100`. With a text term present,
    /// results come back in relevance order; otherwise they are sorted by
    /// `discounted_price_usd` ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] on connection failure or
    /// [`StoreError::MalformedReply`] when the index reply cannot be parsed.
    pub async fn search(
        &self,
        page_number: u32,
        page_size: u32,
        filter: &OfferFilter,
    ) -> Result<OfferPage, StoreError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page_number) * u64::from(page_size);

        let query = build_query(filter);
        let mut cmd = redis::cmd("FT.SEARCH");
        cmd.arg(INDEX_NAME).arg(&query);
        if !filter.is_text_search() {
            cmd.arg("SORTBY").arg("discounted_price_usd").arg("ASC");
        }
        cmd.arg("LIMIT")
            .arg(offset)
            .arg(u64::from(page_size))
            .arg("DIALECT")
            .arg(2);

        let mut conn = self.conn.clone();
        let reply: redis::Value = cmd.query_async(&mut conn).await?;
        let (total, items) = parse_search_reply(&reply)?;

        Ok(OfferPage {
            page_number,
            page_size,
            pages_count: pages_count(total, page_size),
            total,
            items,
        })
    }
}

/// `ceil(total / page_size)` in integer arithmetic.
#[must_use]
pub fn pages_count(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

/// Keep letters, digits, and single spaces; everything else would be query
/// syntax in the hands of the caller.
fn sanitize_text(value: &str) -> String {
    let kept: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape a value for use inside a `{...}` tag clause.
fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn build_query(filter: &OfferFilter) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(text) = filter.text.as_deref() {
        let text = sanitize_text(text);
        if !text.is_empty() {
            clauses.push(format!(
                "@name_en|name_pl|description_en|description_pl:({text})"
            ));
        }
    }
    if let Some(category) = filter.category.as_deref() {
        let v = escape_tag_value(category);
        clauses.push(format!("(@category_en:{{{v}}} | @category_pl:{{{v}}})"));
    }
    if let Some(brand) = filter.brand.as_deref() {
        let v = escape_tag_value(brand);
        clauses.push(format!("@brand_name:{{{v}}}"));
    }
    if let Some(tag) = filter.tag.as_deref() {
        let v = escape_tag_value(tag);
        clauses.push(format!("(@tags_en:{{{v}}} | @tags_pl:{{{v}}})"));
    }
    if filter.price_min.is_some() || filter.price_max.is_some() {
        let min = filter
            .price_min
            .map_or_else(|| "-inf".to_string(), |p| p.to_string());
        let max = filter
            .price_max
            .map_or_else(|| "+inf".to_string(), |p| p.to_string());
        clauses.push(format!("@discounted_price_usd:[{min} {max}]"));
    }

    if clauses.is_empty() {
        "*".to_string()
    } else {
        clauses.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

fn value_as_string(value: &redis::Value) -> Option<String> {
    match value {
        redis::Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        redis::Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

/// Decode an `FT.SEARCH` reply: `[total, key, fields, key, fields, ...]`
/// where `fields` pairs attribute names with values and the `$` attribute
/// holds the whole JSON document.
fn parse_search_reply(value: &redis::Value) -> Result<(u64, Vec<ProductDocument>), StoreError> {
    let redis::Value::Array(items) = value else {
        return Err(StoreError::MalformedReply(
            "expected a top-level array".to_string(),
        ));
    };

    let mut iter = items.iter();
    let total = match iter.next() {
        Some(redis::Value::Int(n)) => u64::try_from(*n).unwrap_or(0),
        other => {
            return Err(StoreError::MalformedReply(format!(
                "expected a leading total, got {other:?}"
            )))
        }
    };

    let mut docs = Vec::new();
    while let Some(key_value) = iter.next() {
        let key = value_as_string(key_value).ok_or_else(|| {
            StoreError::MalformedReply("expected a document key".to_string())
        })?;

        let Some(redis::Value::Array(pairs)) = iter.next() else {
            return Err(StoreError::MalformedReply(format!(
                "missing field list for key {key}"
            )));
        };

        let mut i = 0;
        while i + 1 < pairs.len() {
            let name = value_as_string(&pairs[i]);
            if name.as_deref() == Some("$") {
                let raw = value_as_string(&pairs[i + 1]).ok_or_else(|| {
                    StoreError::MalformedReply(format!("non-string document body for {key}"))
                })?;
                let doc: ProductDocument = serde_json::from_str(&raw)
                    .map_err(|source| StoreError::Decode { key: key.clone(), source })?;
                docs.push(doc);
                break;
            }
            i += 2;
        }
    }

    Ok((total, docs))
}
