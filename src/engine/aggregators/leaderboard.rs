// Leaderboard over a snapshot block range.

use log::{info, warn};
use serde_json::{json, Value};

use axlscan_core::metrics::{aggregate_snapshots, score_leaderboard, LeaderboardRow, SnapshotValidator};
use axlscan_core::{ScanError, ScanResult, SearchQuery, SearchSource};

pub const SNAPSHOTS_INDEX: &str = "validators_snapshots";

/// Snapshot documents requested per range.
const MAX_SNAPSHOTS: u64 = 1_000;

/// Flatten `{ snapshot_block, validators: [...] }` documents into rows.
pub fn snapshot_rows(docs: &[Value]) -> Vec<SnapshotValidator> {
    docs.iter()
        .flat_map(|doc| {
            let height = match doc.get("snapshot_block").or_else(|| doc.get("height")) {
                Some(Value::Number(n)) => n.as_u64(),
                Some(Value::String(s)) => s.parse().ok(),
                _ => None,
            };
            let validators = doc.get("validators").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            validators.into_iter().filter_map(move |v| {
                let mut row = serde_json::from_value::<SnapshotValidator>(v).ok()?;
                row.snapshot_height = height?;
                Some(row)
            })
        })
        .collect()
}

/// Score validators over snapshots `[from, to]`. `Ok(None)` when the search
/// index is unavailable.
pub async fn leaderboard(search: &dyn SearchSource, from: u64, to: u64) -> ScanResult<Option<Vec<LeaderboardRow>>> {
    if from > to {
        return Err(ScanError::Other(format!("snapshot range is empty: {} > {}", from, to)));
    }
    let query = SearchQuery::new(
        SNAPSHOTS_INDEX,
        json!({ "bool": { "must": [{ "range": { "snapshot_block": { "gte": from, "lte": to } } }] } }),
    )
    .size(MAX_SNAPSHOTS)
    .sort(json!([{ "snapshot_block": "asc" }]));

    let response = match search.search(&query).await {
        Ok(r) => r,
        Err(e) => {
            warn!("[leaderboard] snapshots {}..{} unavailable: {}", from, to, e);
            return Ok(None);
        }
    };
    let rows = snapshot_rows(&response.data);
    let scored = score_leaderboard(aggregate_snapshots(&rows, from, to));
    info!("[leaderboard] {} snapshots, {} validators ranked", response.data.len(), scored.len());
    Ok(Some(scored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_carry_snapshot_height() {
        let docs = vec![
            json!({ "snapshot_block": 100, "validators": [
                { "operator_address": "axelarvaloper1a", "uptime": 99.0 },
                { "operator_address": "axelarvaloper1b", "jailed": true }
            ]}),
            json!({ "validators": [{ "operator_address": "axelarvaloper1c" }] }),
        ];
        let rows = snapshot_rows(&docs);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.snapshot_height == 100));
        assert!(rows[1].jailed);
    }
}
