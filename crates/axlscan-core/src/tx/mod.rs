// axlscan core: Transaction Decoder
// status, tx_type, sender, fee, activities, decode.
//
// Every function accepts the canonical `TxRecord` (see `shape`) and never
// fails: missing or malformed input yields `None` / empty output.

pub mod activities;
pub mod shape;

use serde_json::Value;

pub use activities::activities;
pub use shape::{timestamp_ms, Attribute, TxEvent, TxLog, TxRecord};

use crate::atoms::constants::TX_TYPE_SUFFIX;
use crate::atoms::types::{Activity, DecodedTx, TxStatus};
use crate::denoms::{DenomRegistry, RawAmount};

/// `Success` iff the result code is zero or absent.
pub fn status(tx: &TxRecord) -> TxStatus {
    match tx.code {
        Some(code) if code != 0 => TxStatus::Failed,
        _ => TxStatus::Success,
    }
}

/// Short message type of a transaction, e.g. `"Link"` for
/// `/axelar.axelarnet.v1beta1.LinkRequest`.
///
/// Priority: explicit `types` (last one), inner message type of a
/// successful tx, top-level message type of a failed tx, then the `action`
/// attribute of a `message` event.
pub fn tx_type(tx: &TxRecord) -> Option<String> {
    let raw = tx
        .types
        .last()
        .cloned()
        .or_else(|| message_type(tx))
        .or_else(|| action_attribute(tx))?;
    normalize_type(&raw)
}

fn message_type(tx: &TxRecord) -> Option<String> {
    let type_of = |m: &Value| m.get("@type").and_then(|t| t.as_str()).map(String::from);
    match status(tx) {
        TxStatus::Success => tx
            .messages
            .iter()
            .find_map(|m| m.get("inner_message").and_then(type_of))
            .or_else(|| tx.messages.first().and_then(type_of)),
        TxStatus::Failed => tx.messages.first().and_then(type_of),
    }
}

fn action_attribute(tx: &TxRecord) -> Option<String> {
    tx.logs
        .iter()
        .flat_map(|l| l.events.iter())
        .filter(|e| e.event_type == "message")
        .flat_map(|e| e.attributes.iter())
        .find(|a| a.key == "action" && !a.value.is_empty())
        .map(|a| a.value.clone())
}

/// Last `.` or `/` separated segment with a trailing `Request` removed.
pub(crate) fn normalize_type(raw: &str) -> Option<String> {
    let segment = raw.rsplit(['.', '/']).next().unwrap_or(raw).trim();
    let stripped = segment.strip_suffix(TX_TYPE_SUFFIX).filter(|s| !s.is_empty()).unwrap_or(segment);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// First non-empty of: message `sender` / `signer` / `from_address`,
/// flattened sender fields, or an activity sender.
pub fn sender(tx: &TxRecord, activities: &[Activity]) -> Option<String> {
    const MESSAGE_SENDER_KEYS: [&str; 3] = ["sender", "signer", "from_address"];
    let from_messages = tx.messages.iter().find_map(|m| {
        MESSAGE_SENDER_KEYS.iter().find_map(|k| {
            m.get(*k).and_then(|v| v.as_str()).filter(|s| !s.is_empty()).map(String::from)
        })
    });
    from_messages
        .or_else(|| tx.flat_senders.iter().find(|s| !s.is_empty()).cloned())
        .or_else(|| activities.iter().find_map(|a| a.sender.clone()))
}

/// Total fee in display units of the native fee denom.
pub fn fee(tx: &TxRecord, registry: &DenomRegistry, native_denom: &str) -> Option<f64> {
    if tx.fee_amounts.is_empty() {
        return None;
    }
    let raw: f64 = tx.fee_amounts.iter().map(|c| c.amount.as_str().raw_value()).sum();
    Some(registry.amount(raw, native_denom, None))
}

/// Decode a canonical record into a display-ready row.
pub fn decode(tx: &TxRecord, registry: &DenomRegistry, native_denom: &str) -> DecodedTx {
    let activities = activities(tx, registry);
    DecodedTx {
        txhash: tx.txhash.clone(),
        height: tx.height,
        timestamp: tx.timestamp.clone(),
        status: status(tx),
        tx_type: tx_type(tx),
        sender: sender(tx, &activities),
        fee: fee(tx, registry, native_denom),
        gas_used: tx.gas_used,
        gas_wanted: tx.gas_wanted,
        memo: tx.memo.clone().filter(|m| !m.is_empty()),
        activities,
    }
}

/// Normalize and decode a raw JSON transaction in one step.
pub fn decode_value(v: &Value, registry: &DenomRegistry, native_denom: &str) -> DecodedTx {
    decode(&TxRecord::from_value(v), registry, native_denom)
}
