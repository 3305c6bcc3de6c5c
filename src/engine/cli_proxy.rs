// axlscan Engine: CLI-executor proxy
// POST `{ cmd, cache, cache_timeout }` → `{ stdout }`, plus parsers for the
// `axelard` query outputs the validator aggregator needs.
//
// stdout is frequently JSON encoded as a string (sometimes twice). Every
// parser here swallows decode failures and returns an empty result, so one
// broken command never blocks the rest of a view.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use axlscan_core::{CliSource, ScanError, ScanResult, TssIllegibilityInfo};

use super::http::JsonEndpoint;

// ── Commands ───────────────────────────────────────────────────────────

pub const CMD_SNAPSHOT_VALIDATORS: &str = "axelard q snapshot validators -oj";
pub const CMD_DEACTIVATED_OPERATORS: &str = "axelard q snapshot deactivated-operators -oj";
pub const CMD_TENDERMINT_VALIDATOR_SET: &str = "axelard q tendermint-validator-set --limit 1000 -oj";

pub fn proxy_cmd(operator_address: &str) -> String {
    format!("axelard q snapshot proxy {} -oj", operator_address)
}

// ── Client ─────────────────────────────────────────────────────────────

pub struct CliClient {
    endpoint: JsonEndpoint,
}

impl CliClient {
    pub fn new(endpoint: JsonEndpoint) -> Self {
        CliClient { endpoint }
    }
}

#[async_trait]
impl CliSource for CliClient {
    async fn exec(&self, cmd: &str, cache: bool, cache_timeout: Option<u64>) -> ScanResult<String> {
        debug!("[cli] {}", cmd);
        let mut body = json!({ "cmd": cmd, "cache": cache });
        if let Some(timeout) = cache_timeout {
            body["cache_timeout"] = json!(timeout);
        }
        let response = self.endpoint.post("", &body).await?;
        match response.get("stdout") {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) if !other.is_null() => Ok(other.to_string()),
            _ => {
                let stderr = response.get("stderr").and_then(|s| s.as_str()).unwrap_or("no stdout");
                Err(ScanError::api(self.endpoint.name(), format!("{}: {}", cmd, stderr)))
            }
        }
    }
}

// ── stdout parsing ─────────────────────────────────────────────────────

/// Decode stdout as JSON, unwrapping string-encoded JSON.
pub fn parse_stdout(stdout: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_str(stdout.trim()).ok()?;
    for _ in 0..2 {
        let Value::String(s) = &value else { break };
        let Ok(inner) = serde_json::from_str::<Value>(s) else { break };
        value = inner;
    }
    Some(value)
}

/// Operator → TSS illegibility reasons from `snapshot validators`.
pub fn parse_snapshot_validators(stdout: &str) -> HashMap<String, TssIllegibilityInfo> {
    let Some(v) = parse_stdout(stdout) else {
        debug!("[cli] snapshot validators: undecodable stdout");
        return HashMap::new();
    };
    v.get("validators")
        .and_then(|l| l.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|item| {
                    let operator = item.get("operator_address")?.as_str()?.to_lowercase();
                    let info = item
                        .get("tss_illegibility_info")
                        .and_then(|i| serde_json::from_value::<TssIllegibilityInfo>(i.clone()).ok())
                        .unwrap_or_default();
                    Some((operator, info))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_deactivated_operators(stdout: &str) -> HashSet<String> {
    parse_stdout(stdout)
        .and_then(|v| v.get("operator_addresses").and_then(|l| l.as_array()).cloned())
        .map(|list| list.iter().filter_map(|a| a.as_str()).map(str::to_lowercase).collect())
        .unwrap_or_default()
}

/// Broadcaster address from `snapshot proxy <operator>`.
pub fn parse_proxy(stdout: &str) -> Option<String> {
    parse_stdout(stdout)?
        .get("address")
        .and_then(|a| a.as_str())
        .filter(|a| !a.is_empty())
        .map(String::from)
}

/// One entry of `tendermint-validator-set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusValidator {
    pub address: String,
    /// Base64 public key, as in the staking validator's `consensus_pubkey.key`.
    pub pub_key: String,
    pub voting_power: u64,
}

pub fn parse_validator_set(stdout: &str) -> Vec<ConsensusValidator> {
    let Some(v) = parse_stdout(stdout) else {
        return Vec::new();
    };
    v.get("validators")
        .and_then(|l| l.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|item| {
                    let address = item.get("address")?.as_str()?.to_string();
                    let key = item.get("pub_key")?;
                    let pub_key = key.get("key").or_else(|| key.get("value"))?.as_str()?.to_string();
                    let voting_power = match item.get("voting_power") {
                        Some(Value::String(s)) => s.parse().unwrap_or(0),
                        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
                        _ => 0,
                    };
                    Some(ConsensusValidator { address, pub_key, voting_power })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_encoded_json() {
        let once = r#"{"address":"axelar1proxy"}"#;
        let twice = serde_json::to_string(once).unwrap();
        assert_eq!(parse_proxy(once).as_deref(), Some("axelar1proxy"));
        assert_eq!(parse_proxy(&twice).as_deref(), Some("axelar1proxy"));
        assert_eq!(parse_proxy("Error: not found"), None);
    }

    #[test]
    fn snapshot_validators() {
        let stdout = r#"{"validators":[
            {"operator_address":"axelarvaloper1A","tss_illegibility_info":{"jailed":true}},
            {"operator_address":"axelarvaloper1b"}
        ]}"#;
        let map = parse_snapshot_validators(stdout);
        assert!(map["axelarvaloper1a"].jailed);
        assert!(!map["axelarvaloper1b"].any());
        assert!(parse_snapshot_validators("garbage").is_empty());
    }

    #[test]
    fn deactivated() {
        let set = parse_deactivated_operators(r#"{"operator_addresses":["axelarvaloper1X"]}"#);
        assert!(set.contains("axelarvaloper1x"));
    }

    #[test]
    fn validator_set_pubkeys() {
        let stdout = r#"{"block_height":"10","validators":[
            {"address":"axelarvalcons1a","pub_key":{"type":"tendermint/PubKeyEd25519","value":"QUJD"},"voting_power":"7"},
            {"address":"axelarvalcons1b","pub_key":{"@type":"/cosmos.crypto.ed25519.PubKey","key":"REVG"},"voting_power":3}
        ]}"#;
        let set = parse_validator_set(stdout);
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].pub_key, "QUJD");
        assert_eq!(set[0].voting_power, 7);
        assert_eq!(set[1].pub_key, "REVG");
    }
}
