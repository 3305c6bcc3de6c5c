// Per-validator metrics: block uptime, heartbeat participation, jailing
// history and EVM vote tally, each computed from search-index history over
// its own trailing window. A failing source leaves only its metric empty.

use log::warn;
use serde::Serialize;
use serde_json::{json, Value};

use axlscan_core::metrics::{
    heartbeat_blocks, jailing_history, max_missed_blocks, tally_votes, uptime_from_series, uptime_series,
    EvmPoll, EvmVote, HeartbeatStats, HeartbeatTx, JailingHistory, SignedBlock, VoteTally,
};
use axlscan_core::tx::timestamp_ms;
use axlscan_core::{HeartbeatBlock, SearchQuery, SearchSource, UptimeBlock, ValidatorRecord};

use crate::engine::config::ExplorerConfig;
use crate::engine::fetchers::Fetchers;

pub const UPTIMES_INDEX: &str = "uptimes";
pub const HEARTBEATS_INDEX: &str = "heartbeats";
pub const EVM_POLLS_INDEX: &str = "evm_polls";
pub const EVM_VOTES_INDEX: &str = "evm_votes";

/// Upper bound on documents requested from one index in one query.
const MAX_DOCS: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct ProfileWindows {
    pub uptime_blocks: u64,
    pub heartbeat_blocks: u64,
    pub blocks_per_heartbeat: u64,
    pub evm_votes_blocks: u64,
    pub max_missed_fallback: u64,
}

impl From<&ExplorerConfig> for ProfileWindows {
    fn from(c: &ExplorerConfig) -> Self {
        ProfileWindows {
            uptime_blocks: c.num_uptime_blocks,
            heartbeat_blocks: c.num_heartbeat_blocks,
            blocks_per_heartbeat: c.num_blocks_per_heartbeat,
            evm_votes_blocks: c.num_evm_votes_blocks,
            max_missed_fallback: c.max_missed_blocks,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidatorMetrics {
    pub operator_address: String,
    pub latest_height: Option<u64>,
    pub uptime: Option<f64>,
    pub uptime_blocks: Vec<UptimeBlock>,
    pub heartbeats: Option<HeartbeatStats>,
    pub heartbeat_blocks: Vec<HeartbeatBlock>,
    pub jailing: Option<JailingHistory>,
    pub votes: Option<VoteTally>,
}

// ── document adapters ──────────────────────────────────────────────────

fn u64_field(doc: &Value, key: &str) -> Option<u64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn str_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(|s| s.as_str()).filter(|s| !s.is_empty()).map(String::from)
}

fn str_list(doc: &Value, key: &str) -> Vec<String> {
    doc.get(key)
        .and_then(|l| l.as_array())
        .map(|l| l.iter().filter_map(|s| s.as_str()).map(String::from).collect())
        .unwrap_or_default()
}

/// Timestamps are stored as epoch milliseconds or RFC 3339 strings.
fn time_field(doc: &Value) -> i64 {
    match doc.get("timestamp").or_else(|| doc.get("time")) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => timestamp_ms(s).unwrap_or(0),
        _ => 0,
    }
}

pub fn signed_block_from(doc: &Value) -> Option<SignedBlock> {
    Some(SignedBlock { height: u64_field(doc, "height")?, timestamp: time_field(doc), signers: str_list(doc, "validators") })
}

pub fn heartbeat_from(doc: &Value) -> Option<HeartbeatTx> {
    let ineligibilities = doc
        .get("ineligibilities")
        .and_then(|i| i.as_object())
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))).collect())
        .unwrap_or_default();
    Some(HeartbeatTx {
        height: u64_field(doc, "height")?,
        sender: str_field(doc, "sender")?,
        key_ids: str_list(doc, "key_ids"),
        ineligibilities,
    })
}

pub fn poll_from(doc: &Value) -> Option<EvmPoll> {
    Some(EvmPoll {
        poll_id: str_field(doc, "poll_id").or_else(|| str_field(doc, "id"))?,
        chain: str_field(doc, "sender_chain").or_else(|| str_field(doc, "chain"))?,
        height: u64_field(doc, "height").unwrap_or(0),
    })
}

pub fn vote_from(doc: &Value) -> Option<EvmVote> {
    Some(EvmVote {
        poll_id: str_field(doc, "poll_id")?,
        chain: str_field(doc, "sender_chain").or_else(|| str_field(doc, "chain"))?,
        voter: str_field(doc, "voter")?,
        vote: doc.get("vote").and_then(|v| v.as_bool())?,
        height: u64_field(doc, "height").unwrap_or(0),
    })
}

// ── search helpers ─────────────────────────────────────────────────────

fn window_query(since: u64, matches: &[(&str, &str)]) -> Value {
    let mut must: Vec<Value> = matches.iter().map(|(k, v)| json!({ "match": { *k: v } })).collect();
    must.push(json!({ "range": { "height": { "gte": since } } }));
    json!({ "bool": { "must": must } })
}

async fn search_docs<T>(
    search: &dyn SearchSource,
    index: &str,
    query: Value,
    size: u64,
    parse: fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    let q = SearchQuery::new(index, query).size(size.min(MAX_DOCS)).sort(json!([{ "height": "desc" }]));
    match search.search(&q).await {
        Ok(response) => Some(response.data.iter().filter_map(parse).collect()),
        Err(e) => {
            warn!("[profile] {} query failed: {}", index, e);
            None
        }
    }
}

/// Compute every metric of one validator. The latest block anchors all
/// windows; without it nothing can be computed and every metric is empty.
pub async fn validator_profile(
    search: &dyn SearchSource,
    fetchers: &Fetchers,
    windows: &ProfileWindows,
    record: &ValidatorRecord,
) -> ValidatorMetrics {
    let mut metrics = ValidatorMetrics { operator_address: record.operator_address.clone(), ..Default::default() };

    let (latest, params) = tokio::join!(fetchers.latest_block(), fetchers.slashing_params());
    let Some(latest) = latest.map(|b| b.height) else {
        warn!("[profile] latest block unavailable for {}", record.operator_address);
        return metrics;
    };
    metrics.latest_height = Some(latest);

    let consensus = record.consensus_address.as_deref();
    let broadcaster = record.broadcaster_address.as_deref();

    let uptime_docs = async {
        let address = consensus?;
        let since = latest.saturating_sub(windows.uptime_blocks);
        search_docs(search, UPTIMES_INDEX, window_query(since, &[]), windows.uptime_blocks, signed_block_from)
            .await
            .map(|blocks| (address, blocks))
    };
    let heartbeat_docs = async {
        let sender = broadcaster?;
        let since = latest.saturating_sub(windows.heartbeat_blocks);
        let size = windows.heartbeat_blocks / windows.blocks_per_heartbeat.max(1) * 2;
        search_docs(search, HEARTBEATS_INDEX, window_query(since, &[("sender", sender)]), size, heartbeat_from).await
    };
    let vote_docs = async {
        let voter = broadcaster?;
        let since = latest.saturating_sub(windows.evm_votes_blocks);
        let (polls, votes) = tokio::join!(
            search_docs(search, EVM_POLLS_INDEX, window_query(since, &[]), MAX_DOCS, poll_from),
            search_docs(search, EVM_VOTES_INDEX, window_query(since, &[("voter", voter)]), MAX_DOCS, vote_from),
        );
        Some((voter, polls?, votes?))
    };
    let (uptime_docs, heartbeat_docs, vote_docs) = tokio::join!(uptime_docs, heartbeat_docs, vote_docs);

    match uptime_docs {
        Some((address, blocks)) => {
            let series = uptime_series(address, &blocks);
            let window = windows.uptime_blocks.min(latest);
            metrics.uptime = Some(uptime_from_series(&series, window));
            let max_missed = max_missed_blocks(params.as_ref(), windows.max_missed_fallback);
            metrics.jailing = Some(jailing_history(&series, max_missed));
            metrics.uptime_blocks = series;
        }
        None => metrics.uptime = record.uptime,
    }

    if let Some(txs) = heartbeat_docs {
        let blocks = heartbeat_blocks(
            latest,
            windows.heartbeat_blocks,
            windows.blocks_per_heartbeat,
            record.start_proxy_height,
            &txs,
        );
        metrics.heartbeats = Some(HeartbeatStats::from_blocks(&blocks));
        metrics.heartbeat_blocks = blocks;
    }

    if let Some((voter, polls, votes)) = vote_docs {
        metrics.votes = Some(tally_votes(voter, &polls, &votes));
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_tolerate_shapes() {
        let b = signed_block_from(&json!({ "height": "12", "timestamp": "1970-01-01T00:00:02Z", "validators": ["a"] })).unwrap();
        assert_eq!((b.height, b.timestamp, b.signers.len()), (12, 2_000, 1));
        assert!(signed_block_from(&json!({ "validators": [] })).is_none());

        let h = heartbeat_from(&json!({ "height": 51, "sender": "axelar1p", "key_ids": ["k"] })).unwrap();
        assert_eq!(h.key_ids, vec!["k".to_string()]);

        let p = poll_from(&json!({ "id": "9", "sender_chain": "ethereum" })).unwrap();
        assert_eq!(p.poll_id, "9");

        assert!(vote_from(&json!({ "poll_id": "9", "sender_chain": "ethereum", "voter": "x" })).is_none());
    }

    #[test]
    fn window_query_shape() {
        let q = window_query(90, &[("sender", "axelar1p")]);
        assert_eq!(q["bool"]["must"][0]["match"]["sender"], "axelar1p");
        assert_eq!(q["bool"]["must"][1]["range"]["height"]["gte"], 90);
    }
}
