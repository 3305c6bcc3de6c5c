// axlscan core: pagination
// Cursor pages from LCD list endpoints, deduplicating merge, the bounded
// "fetch everything" driver, and offset plans for the incremental tx view.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atoms::constants::DEFAULT_PAGE_SIZE;
use crate::atoms::error::{ScanError, ScanResult};
use crate::atoms::traits::LcdSource;
use crate::tx::shape::u64_value;

// ── Cursor ─────────────────────────────────────────────────────────────────

/// Position in a cursor-paginated list. `Start` is the "first call"
/// sentinel; exhaustion is represented by having no cursor at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Start,
    Key(String),
}

impl PageCursor {
    /// Cursor for the following request. Absent and empty keys both mean
    /// the list is exhausted.
    pub fn next(next_key: Option<&str>) -> Option<Self> {
        next_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| PageCursor::Key(k.to_string()))
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            PageCursor::Start => None,
            PageCursor::Key(k) => Some(k),
        }
    }
}

// ── Request / response ─────────────────────────────────────────────────────

/// A paged LCD list endpoint.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Resource label for logs and errors ("validators", "balances", …).
    pub resource: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    /// Field of the response body holding the page items.
    pub items_field: String,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(resource: impl Into<String>, path: impl Into<String>, items_field: impl Into<String>) -> Self {
        PageRequest {
            resource: resource.into(),
            path: path.into(),
            params: Vec::new(),
            items_field: items_field.into(),
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn params_with_cursor(&self, cursor: &PageCursor) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        params.push(("pagination.limit".into(), self.limit.to_string()));
        if let Some(key) = cursor.key() {
            params.push(("pagination.key".into(), key.to_string()));
        }
        params
    }

    pub fn params_with_offset(&self, offset: u64, limit: u64) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        params.push(("pagination.offset".into(), offset.to_string()));
        params.push(("pagination.limit".into(), limit.to_string()));
        params.push(("pagination.count_total".into(), "true".into()));
        params
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_key: Option<String>,
    pub total: Option<u64>,
}

impl Page {
    /// Read `{ <items_field>: [...], pagination: { next_key, total } }`.
    /// The tx search endpoint reports `total` at the top level instead.
    pub fn from_body(body: &Value, items_field: &str) -> Self {
        let items = body
            .get(items_field)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let next_key = body
            .pointer("/pagination/next_key")
            .and_then(|k| k.as_str())
            .map(String::from);
        let total = u64_value(body.pointer("/pagination/total")).or_else(|| u64_value(body.get("total")));
        Page { items, next_key, total }
    }
}

/// Result of a full pagination run.
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    pub items: Vec<Value>,
    pub pages: usize,
    pub total: Option<u64>,
    /// False when a later page failed and the set is partial.
    pub complete: bool,
}

// ── Keyed merge ────────────────────────────────────────────────────────────

/// Unique key of an item at a JSON pointer (`/denom`, `/delegation/validator_address`).
pub fn key_of(item: &Value, pointer: &str) -> Option<String> {
    match item.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fill attributes that are absent (or null) in `into` from `from`.
/// Attributes already present are never overwritten.
pub fn merge_missing(into: &mut Value, from: &Value) {
    let (Some(target), Some(source)) = (into.as_object_mut(), from.as_object()) else {
        return;
    };
    for (k, v) in source {
        match target.get_mut(k) {
            None | Some(Value::Null) => {
                target.insert(k.clone(), v.clone());
            }
            Some(existing @ Value::Object(_)) => merge_missing(existing, v),
            Some(_) => {}
        }
    }
}

/// Order-preserving set of JSON items deduplicated by key. Items without a
/// key cannot be deduplicated and are appended as-is.
#[derive(Debug, Clone)]
pub struct KeyedMerge {
    pointer: String,
    items: Vec<Value>,
    index: HashMap<String, usize>,
}

impl KeyedMerge {
    pub fn new(pointer: impl Into<String>) -> Self {
        KeyedMerge { pointer: pointer.into(), items: Vec::new(), index: HashMap::new() }
    }

    pub fn with_existing(pointer: impl Into<String>, existing: Vec<Value>) -> Self {
        let mut merge = Self::new(pointer);
        merge.extend(existing);
        merge
    }

    /// Returns true when the item was not seen before.
    pub fn insert(&mut self, item: Value) -> bool {
        match key_of(&item, &self.pointer) {
            Some(key) => match self.index.get(&key) {
                Some(&i) => {
                    merge_missing(&mut self.items[i], &item);
                    false
                }
                None => {
                    self.index.insert(key, self.items.len());
                    self.items.push(item);
                    true
                }
            },
            None => {
                self.items.push(item);
                true
            }
        }
    }

    /// Returns how many items were new.
    pub fn extend(&mut self, items: impl IntoIterator<Item = Value>) -> usize {
        items.into_iter().map(|i| self.insert(i)).filter(|new| *new).count()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

// ── Driver ─────────────────────────────────────────────────────────────────

/// Fetch every page of `request`, deduplicating by `key_pointer`.
///
/// `Ok(None)` means the first page failed and callers keep their previous
/// state. A later failure yields `Ok(Some(set))` with `complete == false`.
/// `PaginationLimit` is returned when the backend still hands back a cursor
/// after `max_pages` requests.
pub async fn collect_all(
    source: &dyn LcdSource,
    request: &PageRequest,
    key_pointer: &str,
    max_pages: usize,
) -> ScanResult<Option<PageSet>> {
    let mut merged = KeyedMerge::new(key_pointer);
    let mut cursor = PageCursor::Start;
    let mut pages = 0usize;
    let mut total = None;

    loop {
        if pages >= max_pages {
            warn!(
                "[paging] {} still returned a cursor after {} pages, giving up",
                request.resource, pages
            );
            return Err(ScanError::PaginationLimit { resource: request.resource.clone(), pages });
        }

        let page = match source.fetch_page(request, &cursor).await {
            Ok(page) => page,
            Err(e) if pages == 0 => {
                warn!("[paging] {} first page failed on {}: {}", request.resource, source.name(), e);
                return Ok(None);
            }
            Err(e) => {
                warn!("[paging] {} page {} failed, keeping partial set: {}", request.resource, pages + 1, e);
                return Ok(Some(PageSet { items: merged.into_items(), pages, total, complete: false }));
            }
        };
        pages += 1;
        total = page.total.or(total);
        let added = merged.extend(page.items);
        debug!("[paging] {} page {}: {} new ({} total)", request.resource, pages, added, merged.len());

        match PageCursor::next(page.next_key.as_deref()) {
            Some(next) if next == cursor => {
                warn!("[paging] {} echoed the same cursor, stopping", request.resource);
                return Ok(Some(PageSet { items: merged.into_items(), pages, total, complete: false }));
            }
            Some(next) => cursor = next,
            None => {
                return Ok(Some(PageSet { items: merged.into_items(), pages, total, complete: true }));
            }
        }
    }
}

// ── Incremental tx view ────────────────────────────────────────────────────
//
// The tx search endpoint is queried in ascending order, so an offset keeps
// pointing at the same transaction while new ones are appended at the end.
// The view shows the newest page first and grows backwards on "load more".

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingMode {
    /// First view: newest page.
    Latest,
    /// Poll: only transactions appended since the last fetch.
    Refresh,
    /// User asked for the next older page.
    LoadMore,
}

/// What has been loaded so far: the lowest loaded offset and the total count
/// at the time of the last refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCursor {
    pub lowest_offset: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub offset: u64,
    pub limit: u64,
    /// The loaded list must be replaced rather than extended (gap too large).
    pub replace: bool,
}

/// Decide which slice to fetch next. `None` means nothing new to fetch.
pub fn plan_tx_page(mode: PagingMode, cursor: Option<&TxCursor>, total: u64, page_size: u64) -> Option<PagePlan> {
    let page_size = page_size.max(1);
    let latest = || {
        if total == 0 {
            return None;
        }
        let offset = total.saturating_sub(page_size);
        Some(PagePlan { offset, limit: total - offset, replace: true })
    };

    match (mode, cursor) {
        (PagingMode::Latest, _) | (_, None) => latest(),
        (PagingMode::Refresh, Some(c)) => {
            if total <= c.total {
                return None;
            }
            let appended = total - c.total;
            if appended > page_size {
                latest()
            } else {
                Some(PagePlan { offset: c.total, limit: appended, replace: false })
            }
        }
        (PagingMode::LoadMore, Some(c)) => {
            if c.lowest_offset == 0 {
                return None;
            }
            let offset = c.lowest_offset.saturating_sub(page_size);
            Some(PagePlan { offset, limit: c.lowest_offset - offset, replace: false })
        }
    }
}

impl TxCursor {
    /// Cursor after `plan` has been fetched successfully.
    pub fn after(mode: PagingMode, previous: Option<&TxCursor>, plan: &PagePlan, total: u64) -> TxCursor {
        match previous {
            Some(prev) if !plan.replace => match mode {
                PagingMode::Refresh => TxCursor { lowest_offset: prev.lowest_offset, total },
                PagingMode::LoadMore => TxCursor { lowest_offset: plan.offset, total: prev.total },
                PagingMode::Latest => TxCursor { lowest_offset: plan.offset, total },
            },
            _ => TxCursor { lowest_offset: plan.offset, total },
        }
    }

    pub fn has_more(&self) -> bool {
        self.lowest_offset > 0
    }
}
