// axlscan core: transaction shape adapters
// The LCD, the search index and older SDK versions all return transactions
// in slightly different shapes. `TxRecord::from_value` normalizes every one
// of them into a single canonical record before any decoding runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atoms::types::Coin;
use crate::denoms::split_amount_denom;

/// A single `key=value` event attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxLog {
    pub events: Vec<TxEvent>,
}

/// Canonical transaction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txhash: String,
    pub height: Option<u64>,
    pub timestamp: Option<String>,
    /// Result code; for multi-row results this is the last row's code.
    pub code: Option<i64>,
    pub codespace: Option<String>,
    pub raw_log: Option<String>,
    pub logs: Vec<TxLog>,
    pub messages: Vec<Value>,
    pub fee_amounts: Vec<Coin>,
    pub gas_used: Option<u64>,
    pub gas_wanted: Option<u64>,
    pub memo: Option<String>,
    /// Explicit message types precomputed by the search index.
    pub types: Vec<String>,
    /// Sender fields flattened by the search index (`tx.body.messages.sender`).
    pub flat_senders: Vec<String>,
}

impl TxRecord {
    /// Normalize any known transaction shape. Unknown or missing fields
    /// become `None` / empty, never an error.
    pub fn from_value(v: &Value) -> Self {
        // Some endpoints wrap the response: `{ tx_response: {...}, tx: {...} }`.
        let root = v.get("tx_response").unwrap_or(v);

        let mut record = TxRecord {
            txhash: str_field(root, "txhash")
                .or_else(|| str_field(root, "hash"))
                .unwrap_or_default(),
            height: u64_value(root.get("height")),
            timestamp: str_field(root, "timestamp"),
            code: code_value(root.get("code")),
            codespace: str_field(root, "codespace").filter(|s| !s.is_empty()),
            raw_log: str_field(root, "raw_log"),
            logs: parse_logs(root),
            gas_used: u64_value(root.get("gas_used")),
            gas_wanted: u64_value(root.get("gas_wanted")),
            ..Default::default()
        };

        let tx = root.get("tx").or_else(|| v.get("tx"));
        if let Some(tx) = tx {
            if let Some(messages) = tx.pointer("/body/messages").and_then(|m| m.as_array()) {
                record.messages = messages.clone();
            }
            record.memo = tx.pointer("/body/memo").and_then(|m| m.as_str()).map(String::from);
            if let Some(amounts) = tx.pointer("/auth_info/fee/amount").and_then(|a| a.as_array()) {
                record.fee_amounts = amounts.iter().filter_map(coin_value).collect();
            }
        }

        record.types = string_list(root.get("types"));
        apply_flattened(root, &mut record);
        record
    }
}

// ── Flattened search-index fields ──────────────────────────────────────────

fn apply_flattened(root: &Value, record: &mut TxRecord) {
    let Some(obj) = root.as_object() else { return };

    if record.messages.is_empty() {
        if let Some(types) = obj.get("tx.body.messages.@type") {
            record.messages = string_list(Some(types))
                .into_iter()
                .map(|t| serde_json::json!({ "@type": t }))
                .collect();
        }
    }

    for key in ["tx.body.messages.sender", "tx.body.messages.signer"] {
        record.flat_senders.extend(string_list(obj.get(key)));
    }

    if record.fee_amounts.is_empty() {
        // Flattened fee: an array of bare amounts or of "5000uaxl" strings.
        let flat = obj
            .get("tx.auth_info.fee.amount.amount")
            .or_else(|| obj.get("tx.auth_info.fee.amount"));
        record.fee_amounts = string_list(flat).iter().filter_map(|s| coin_from_str(s)).collect();
    }

    if record.memo.is_none() {
        record.memo = string_list(obj.get("tx.body.memo")).into_iter().next();
    }
}

// ── Field helpers ──────────────────────────────────────────────────────────

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|s| s.as_str()).map(String::from)
}

/// Heights and gas come back as strings from the LCD and numbers from the
/// search index.
pub(crate) fn u64_value(v: Option<&Value>) -> Option<u64> {
    match v? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 block/tx time (`2024-03-01T12:00:00.123Z`) as Unix milliseconds.
pub fn timestamp_ms(raw: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(raw.trim()).ok().map(|t| t.timestamp_millis())
}

/// `code` is a scalar on single transactions and an array on multi-row
/// query results, where the last element is authoritative.
fn code_value(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Array(items) => items.iter().rev().find_map(|i| code_value(Some(i))),
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// A scalar string, or an array of scalars, as a list of strings.
fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coin_value(v: &Value) -> Option<Coin> {
    match v {
        Value::Object(_) => Some(Coin {
            denom: v.get("denom").and_then(|d| d.as_str()).unwrap_or_default().to_string(),
            amount: match v.get("amount") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return None,
            },
        }),
        Value::String(s) => coin_from_str(s),
        _ => None,
    }
}

/// `"5000ibc/27394F..."` → amount `"5000"`, denom `"ibc/27394F..."`. The
/// amount keeps its original digits.
fn coin_from_str(s: &str) -> Option<Coin> {
    let s = s.trim();
    let (amount, denom) = split_amount_denom(s);
    amount?;
    let denom = denom.unwrap_or_default();
    Some(Coin { amount: s[..s.len() - denom.len()].to_string(), denom })
}

fn parse_logs(root: &Value) -> Vec<TxLog> {
    let logs: Vec<TxLog> = root
        .get("logs")
        .and_then(|l| l.as_array())
        .map(|logs| {
            logs.iter()
                .map(|log| TxLog { events: parse_events(log.get("events")) })
                .collect()
        })
        .unwrap_or_default();

    // SDK 0.50 dropped per-message logs; events moved to the top level.
    if logs.iter().all(|l| l.events.is_empty()) {
        let events = parse_events(root.get("events"));
        if !events.is_empty() {
            return vec![TxLog { events }];
        }
    }
    logs
}

fn parse_events(v: Option<&Value>) -> Vec<TxEvent> {
    let Some(events) = v.and_then(|e| e.as_array()) else {
        return Vec::new();
    };
    events
        .iter()
        .filter_map(|e| {
            let event_type = e.get("type").and_then(|t| t.as_str())?.to_string();
            let attributes = e
                .get("attributes")
                .and_then(|a| a.as_array())
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter_map(|a| {
                            let key = a.get("key").and_then(scalar_string)?;
                            let value = a.get("value").and_then(scalar_string).unwrap_or_default();
                            Some(Attribute { key, value })
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(TxEvent { event_type, attributes })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_time_to_millis() {
        assert_eq!(timestamp_ms("1970-01-01T00:00:01.500Z"), Some(1_500));
        assert_eq!(timestamp_ms("not a time"), None);
    }

    #[test]
    fn lcd_shape() {
        let v = json!({
            "tx_response": {
                "txhash": "ABC",
                "height": "123",
                "timestamp": "2024-01-01T00:00:00Z",
                "code": 0,
                "gas_used": "80000",
                "gas_wanted": "100000",
                "logs": [{ "events": [{ "type": "transfer", "attributes": [
                    { "key": "recipient", "value": "axelar1r" },
                    { "key": "amount", "value": "10uaxl" }
                ]}]}],
                "tx": {
                    "body": { "messages": [{ "@type": "/cosmos.bank.v1beta1.MsgSend" }], "memo": "hi" },
                    "auth_info": { "fee": { "amount": [{ "denom": "uaxl", "amount": "5000" }] } }
                }
            }
        });
        let r = TxRecord::from_value(&v);
        assert_eq!(r.txhash, "ABC");
        assert_eq!(r.height, Some(123));
        assert_eq!(r.code, Some(0));
        assert_eq!(r.gas_used, Some(80_000));
        assert_eq!(r.memo.as_deref(), Some("hi"));
        assert_eq!(r.messages.len(), 1);
        assert_eq!(r.fee_amounts, vec![Coin { denom: "uaxl".into(), amount: "5000".into() }]);
        assert_eq!(r.logs[0].events[0].attributes.len(), 2);
    }

    #[test]
    fn code_array_uses_last_element() {
        let r = TxRecord::from_value(&json!({ "txhash": "X", "code": [0, 5] }));
        assert_eq!(r.code, Some(5));
        let r = TxRecord::from_value(&json!({ "txhash": "X", "code": [3, 0] }));
        assert_eq!(r.code, Some(0));
    }

    #[test]
    fn flattened_search_fields() {
        let v = json!({
            "txhash": "F",
            "height": 9,
            "types": ["LinkRequest"],
            "tx.body.messages.sender": ["axelar1s"],
            "tx.auth_info.fee.amount.amount": ["5000"]
        });
        let r = TxRecord::from_value(&v);
        assert_eq!(r.height, Some(9));
        assert_eq!(r.types, vec!["LinkRequest".to_string()]);
        assert_eq!(r.flat_senders, vec!["axelar1s".to_string()]);
        assert_eq!(r.fee_amounts.len(), 1);
        assert_eq!(r.fee_amounts[0].amount, "5000");
    }

    #[test]
    fn flattened_fee_with_ibc_denom() {
        let ibc = "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";
        let v = json!({ "txhash": "I", "tx.auth_info.fee.amount": [format!("5000{}", ibc), "12uaxl"] });
        let r = TxRecord::from_value(&v);
        assert_eq!(
            r.fee_amounts,
            vec![Coin { denom: ibc.into(), amount: "5000".into() }, Coin { denom: "uaxl".into(), amount: "12".into() }]
        );

        let big = json!({ "txhash": "B", "tx.auth_info.fee.amount": ["123456789012345678901uaxl"] });
        assert_eq!(TxRecord::from_value(&big).fee_amounts[0].amount, "123456789012345678901");
    }

    #[test]
    fn top_level_events_when_logs_empty() {
        let v = json!({
            "txhash": "N",
            "logs": [],
            "events": [{ "type": "message", "attributes": [{ "key": "action", "value": "/x.Msg" }] }]
        });
        let r = TxRecord::from_value(&v);
        assert_eq!(r.logs.len(), 1);
        assert_eq!(r.logs[0].events[0].event_type, "message");
    }

    #[test]
    fn garbage_degrades_to_defaults() {
        let r = TxRecord::from_value(&json!("not a tx"));
        assert_eq!(r, TxRecord::default());
    }
}
