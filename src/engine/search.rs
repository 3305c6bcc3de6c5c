// axlscan Engine: search-index client
// One POST route taking `{ index, method: "search", query, aggs, size, from, sort }`.

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use axlscan_core::{ScanError, ScanResult, SearchQuery, SearchResponse, SearchSource};

use super::http::JsonEndpoint;

pub struct SearchClient {
    endpoint: JsonEndpoint,
}

impl SearchClient {
    pub fn new(endpoint: JsonEndpoint) -> Self {
        SearchClient { endpoint }
    }
}

#[async_trait]
impl SearchSource for SearchClient {
    async fn search(&self, query: &SearchQuery) -> ScanResult<SearchResponse> {
        debug!("[search] {} size={} from={}", query.index, query.size, query.from);
        let body = serde_json::to_value(query)?;
        let response = self.endpoint.post("", &body).await?;
        parse_response(self.endpoint.name(), response)
    }
}

/// Accepts `total` as a number, a numeric string, or `{ value: n }`.
pub fn parse_response(source: &str, body: Value) -> ScanResult<SearchResponse> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(ScanError::api(source, error.to_string()));
    }
    let data = match body.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(ScanError::Decode(format!("{}: `data` is not an array", source))),
    };
    let total = match body.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        Some(obj @ Value::Object(_)) => obj.get("value").and_then(|v| v.as_u64()),
        _ => None,
    }
    .unwrap_or(data.len() as u64);
    let aggs = body.get("aggs").filter(|a| !a.is_null()).cloned();
    Ok(SearchResponse { data, aggs, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_shapes() {
        let r = parse_response("search", json!({ "data": [{}, {}], "total": { "value": 40 } })).unwrap();
        assert_eq!(r.total, 40);
        let r = parse_response("search", json!({ "data": [{}] })).unwrap();
        assert_eq!(r.total, 1);
        assert!(r.aggs.is_none());
    }

    #[test]
    fn error_body() {
        assert!(parse_response("search", json!({ "error": "index not found" })).is_err());
        assert!(parse_response("search", json!({ "data": "nope" })).is_err());
    }
}
