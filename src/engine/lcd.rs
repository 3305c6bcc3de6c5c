// axlscan Engine: LCD / REST client
// Cosmos-SDK style GET endpoints (`/cosmos/...`, `/axelar/...`).

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use axlscan_core::{LcdSource, ScanError, ScanResult};

use super::http::JsonEndpoint;

pub struct LcdClient {
    endpoint: JsonEndpoint,
}

impl LcdClient {
    pub fn new(endpoint: JsonEndpoint) -> Self {
        LcdClient { endpoint }
    }
}

#[async_trait]
impl LcdSource for LcdClient {
    fn name(&self) -> &str {
        self.endpoint.name()
    }

    async fn get_json(&self, path: &str, params: &[(String, String)]) -> ScanResult<Value> {
        debug!("[lcd] GET {} ({} params)", path, params.len());
        let body = self.endpoint.get(path, params).await?;
        check_grpc_error(self.endpoint.name(), body)
    }
}

/// The gateway answers some failures with HTTP 200 and a gRPC status body
/// (`{ code: 5, message: "...", details: [] }`).
fn check_grpc_error(source: &str, body: Value) -> ScanResult<Value> {
    let code = body.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
    let is_status = code != 0 && body.get("message").is_some() && body.get("details").is_some();
    if is_status {
        let message = body.get("message").and_then(|m| m.as_str()).unwrap_or_default();
        return Err(ScanError::api(source, format!("gRPC code {}: {}", code, message)));
    }
    Ok(body)
}

/// Percent-encode one path segment (addresses, hashes, chain ids).
pub fn segment(raw: &str) -> String {
    urlencoding::encode(raw.trim()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grpc_status_body_is_an_error() {
        let err = check_grpc_error("lcd", json!({ "code": 5, "message": "not found", "details": [] })).unwrap_err();
        assert!(err.to_string().contains("not found"));
        // A tx response carries `code` too, but is not a status body.
        assert!(check_grpc_error("lcd", json!({ "code": 5, "txhash": "AB" })).is_ok());
    }

    #[test]
    fn segments_are_encoded() {
        assert_eq!(segment("axelar1abc"), "axelar1abc");
        assert_eq!(segment("a/b"), "a%2Fb");
    }
}
