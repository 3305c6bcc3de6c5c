// axlscan core: activity extraction
// One Activity per transfer attribute group or per non-transfer event.

use std::collections::BTreeMap;

use serde_json::Value;

use super::shape::{Attribute, TxEvent, TxRecord};
use super::status;
use crate::atoms::constants::{IGNORED_ACTIVITY_EVENTS, RECIPIENT_KEYS, SENDER_KEYS};
use crate::atoms::types::{Activity, TxStatus};
use crate::denoms::{split_amount_denom, DenomRegistry};

/// Normalized activities of a transaction. A failed transaction without any
/// extractable activity yields a single `failed` sentinel.
pub fn activities(tx: &TxRecord, registry: &DenomRegistry) -> Vec<Activity> {
    let mut out = Vec::new();
    for log in &tx.logs {
        for event in &log.events {
            if IGNORED_ACTIVITY_EVENTS.contains(&event.event_type.as_str()) {
                continue;
            }
            if event.event_type == "transfer" {
                out.extend(transfer_activities(event, registry));
            } else if let Some(activity) = event_activity(event, registry) {
                out.push(activity);
            }
        }
    }

    if out.is_empty() && status(tx) == TxStatus::Failed {
        out.push(Activity::failed_sentinel());
    }
    out
}

// ── transfer events ────────────────────────────────────────────────────────

/// A `transfer` event emitted for several sends repeats its key set
/// (`recipient, sender, amount, recipient, sender, amount`). A key that is
/// already present in the current group marks the start of the next group.
pub(crate) fn group_attributes(attributes: &[Attribute]) -> Vec<BTreeMap<String, String>> {
    let mut groups = Vec::new();
    let mut current: BTreeMap<String, String> = BTreeMap::new();
    for attr in attributes {
        if current.contains_key(&attr.key) {
            groups.push(std::mem::take(&mut current));
        }
        current.insert(attr.key.clone(), attr.value.clone());
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn transfer_activities(event: &TxEvent, registry: &DenomRegistry) -> Vec<Activity> {
    let mut out = Vec::new();
    for group in group_attributes(&event.attributes) {
        let base = Activity {
            event_type: event.event_type.clone(),
            sender: non_empty(group.get("sender")),
            recipient: non_empty(group.get("recipient")).into_iter().collect(),
            ..Default::default()
        };

        let coins: Vec<&str> = group
            .get("amount")
            .map(|a| a.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default();

        if coins.is_empty() {
            out.push(base);
            continue;
        }
        for coin in coins {
            let mut activity = base.clone();
            let (amount, denom) = split_amount_denom(coin);
            fill_amount(&mut activity, amount, denom, registry);
            out.push(activity);
        }
    }
    out
}

// ── other events ───────────────────────────────────────────────────────────

fn event_activity(event: &TxEvent, registry: &DenomRegistry) -> Option<Activity> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    for attr in &event.attributes {
        merged.entry(attr.key.clone()).or_insert_with(|| attr.value.clone());
    }
    substitute_packet_data(&mut merged);

    let mut activity = Activity {
        event_type: event.event_type.clone(),
        action: non_empty(merged.get("action")),
        sender: SENDER_KEYS.iter().find_map(|k| non_empty(merged.get(*k))),
        ..Default::default()
    };
    for key in RECIPIENT_KEYS {
        if let Some(r) = non_empty(merged.get(*key)) {
            if !activity.recipient.contains(&r) {
                activity.recipient.push(r);
            }
        }
    }

    if let Some(raw) = merged.get("amount") {
        let (amount, embedded_denom) = split_amount_denom(raw);
        let denom = non_empty(merged.get("denom")).or(embedded_denom);
        fill_amount(&mut activity, amount, denom, registry);
    }

    let meaningful = activity.action.is_some()
        || activity.sender.is_some()
        || !activity.recipient.is_empty()
        || activity.amount.is_some();
    if !meaningful {
        return None;
    }
    activity.attributes = merged;
    Some(activity)
}

/// IBC packet events carry a JSON `packet_data` attribute whose fields are
/// more precise than the event's own.
fn substitute_packet_data(merged: &mut BTreeMap<String, String>) {
    let Some(raw) = merged.get("packet_data") else { return };
    let Ok(Value::Object(packet)) = serde_json::from_str::<Value>(raw) else {
        return;
    };
    for key in ["denom", "amount", "sender", "receiver"] {
        let value = match packet.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        merged.insert(key.to_string(), value);
    }
}

// ── helpers ────────────────────────────────────────────────────────────────

fn fill_amount(
    activity: &mut Activity,
    amount: Option<f64>,
    denom: Option<String>,
    registry: &DenomRegistry,
) {
    let denom_ref = denom.as_deref().unwrap_or_default();
    activity.amount = amount.map(|a| registry.amount(a, denom_ref, None));
    activity.symbol = denom.as_deref().map(|d| registry.symbol(d).to_string());
    activity.denom = denom.map(|d| registry.id(&d).to_string());
}

fn non_empty(v: Option<&String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::DenomEntry;
    use crate::tx::shape::TxLog;

    fn attr(key: &str, value: &str) -> Attribute {
        Attribute { key: key.into(), value: value.into() }
    }

    fn registry() -> DenomRegistry {
        DenomRegistry::new(vec![DenomEntry {
            id: "uaxl".into(),
            symbol: "AXL".into(),
            decimals: Some(6),
            ..Default::default()
        }])
    }

    fn tx_with(events: Vec<TxEvent>, code: Option<i64>) -> TxRecord {
        TxRecord {
            txhash: "T".into(),
            code,
            logs: vec![TxLog { events }],
            ..Default::default()
        }
    }

    #[test]
    fn groups_split_on_repeated_key() {
        let groups = group_attributes(&[
            attr("recipient", "a"),
            attr("sender", "s"),
            attr("amount", "1uaxl"),
            attr("recipient", "b"),
            attr("sender", "s"),
            attr("amount", "2uaxl"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].get("recipient").map(String::as_str), Some("b"));
    }

    #[test]
    fn multi_send_yields_one_activity_per_group() {
        let event = TxEvent {
            event_type: "transfer".into(),
            attributes: vec![
                attr("recipient", "axelar1a"),
                attr("sender", "axelar1s"),
                attr("amount", "1000000uaxl"),
                attr("recipient", "axelar1b"),
                attr("sender", "axelar1s"),
                attr("amount", "2000000uaxl"),
            ],
        };
        let acts = activities(&tx_with(vec![event], Some(0)), &registry());
        assert_eq!(acts.len(), 2);
        assert_eq!(acts[0].recipient, vec!["axelar1a".to_string()]);
        assert_eq!(acts[0].amount, Some(1.0));
        assert_eq!(acts[1].amount, Some(2.0));
        assert_eq!(acts[1].symbol.as_deref(), Some("AXL"));
    }

    #[test]
    fn amount_prefix_split_without_denom_attribute() {
        let event = TxEvent {
            event_type: "delegate".into(),
            attributes: vec![attr("validator", "axelarvaloper1v"), attr("amount", "100000uaxl")],
        };
        let acts = activities(&tx_with(vec![event], None), &registry());
        assert_eq!(acts.len(), 1);
        assert_eq!(acts[0].amount, Some(0.1));
        assert_eq!(acts[0].denom.as_deref(), Some("uaxl"));
        assert_eq!(acts[0].symbol.as_deref(), Some("AXL"));
        assert_eq!(acts[0].recipient, vec!["axelarvaloper1v".to_string()]);
    }

    #[test]
    fn explicit_denom_attribute_wins() {
        let event = TxEvent {
            event_type: "depositConfirmation".into(),
            attributes: vec![attr("amount", "2500000"), attr("denom", "uaxl"), attr("sender", "x")],
        };
        let acts = activities(&tx_with(vec![event], None), &registry());
        assert_eq!(acts[0].amount, Some(2.5));
        assert_eq!(acts[0].denom.as_deref(), Some("uaxl"));
    }

    #[test]
    fn packet_data_is_substituted() {
        let packet = r#"{"denom":"uaxl","amount":"3000000","sender":"axelar1p","receiver":"osmo1r"}"#;
        let event = TxEvent {
            event_type: "send_packet".into(),
            attributes: vec![attr("packet_data", packet), attr("packet_src_channel", "channel-3")],
        };
        let acts = activities(&tx_with(vec![event], None), &registry());
        assert_eq!(acts.len(), 1);
        assert_eq!(acts[0].amount, Some(3.0));
        assert_eq!(acts[0].sender.as_deref(), Some("axelar1p"));
        assert_eq!(acts[0].recipient, vec!["osmo1r".to_string()]);
    }

    #[test]
    fn failed_tx_without_events_yields_sentinel() {
        let acts = activities(&tx_with(vec![], Some(11)), &registry());
        assert_eq!(acts, vec![Activity::failed_sentinel()]);
        let acts = activities(&tx_with(vec![], Some(0)), &registry());
        assert!(acts.is_empty());
    }

    #[test]
    fn bookkeeping_events_are_ignored() {
        let event = TxEvent {
            event_type: "coin_spent".into(),
            attributes: vec![attr("spender", "axelar1s"), attr("amount", "5uaxl")],
        };
        assert!(activities(&tx_with(vec![event], Some(0)), &registry()).is_empty());
    }
}
