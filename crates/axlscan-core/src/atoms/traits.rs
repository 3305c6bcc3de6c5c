// ── axlscan Atoms: Backend Traits ──────────────────────────────────────────
// The three external collaborators, reduced to the calls the aggregation
// layer makes. The engine implements them over HTTP; tests implement them
// in memory.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ScanResult;
use super::types::{SearchQuery, SearchResponse};
use crate::paging::{Page, PageCursor, PageRequest};

/// Cosmos-SDK style LCD / REST API.
#[async_trait]
pub trait LcdSource: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str {
        "lcd"
    }

    /// GET `path` with query `params` and return the decoded JSON body.
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> ScanResult<Value>;

    /// Fetch one cursor page of a list endpoint.
    async fn fetch_page(&self, request: &PageRequest, cursor: &PageCursor) -> ScanResult<Page> {
        let params = request.params_with_cursor(cursor);
        let body = self.get_json(&request.path, &params).await?;
        Ok(Page::from_body(&body, &request.items_field))
    }

    /// Fetch one offset page of a list endpoint, asking for the total count.
    async fn fetch_offset(&self, request: &PageRequest, offset: u64, limit: u64) -> ScanResult<Page> {
        let params = request.params_with_offset(offset, limit);
        let body = self.get_json(&request.path, &params).await?;
        Ok(Page::from_body(&body, &request.items_field))
    }
}

/// Search-index backend (single POST endpoint with aggregation support).
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> ScanResult<SearchResponse>;
}

/// CLI-executor proxy: runs a chain CLI query and returns its stdout.
#[async_trait]
pub trait CliSource: Send + Sync {
    async fn exec(&self, cmd: &str, cache: bool, cache_timeout: Option<u64>) -> ScanResult<String>;
}
