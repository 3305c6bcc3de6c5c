// Heartbeat participation.
//
// The trailing window is cut into aligned, complete intervals of
// `NUM_BLOCKS_PER_HEARTBEAT` blocks. An interval is "up" when the
// broadcaster submitted at least one heartbeat inside it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::clamp_percent;
use crate::atoms::types::HeartbeatBlock;

/// A heartbeat transaction of one broadcaster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatTx {
    pub height: u64,
    pub sender: String,
    pub key_ids: Vec<String>,
    pub ineligibilities: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStats {
    pub up_heartbeats: u64,
    pub total_heartbeats: u64,
    pub heartbeats_uptime: f64,
}

impl HeartbeatStats {
    pub fn from_blocks(blocks: &[HeartbeatBlock]) -> Self {
        let up = blocks.iter().filter(|b| b.up).count() as u64;
        let total = blocks.len() as u64;
        HeartbeatStats { up_heartbeats: up, total_heartbeats: total, heartbeats_uptime: heartbeats_uptime(up, total) }
    }
}

/// `up * 100 / total`; 0 when there were no intervals.
pub fn heartbeats_uptime(up: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(up as f64 * 100.0 / total as f64)
}

/// Interval blocks for the window ending at `latest_height`, newest first.
///
/// Intervals starting before `start_height` (the broadcaster registration
/// height) are left out, so a new validator is not penalized for intervals
/// it could not have participated in.
pub fn heartbeat_blocks(
    latest_height: u64,
    window: u64,
    interval: u64,
    start_height: Option<u64>,
    heartbeats: &[HeartbeatTx],
) -> Vec<HeartbeatBlock> {
    if interval == 0 || window == 0 {
        return Vec::new();
    }
    let end = latest_height / interval * interval;
    let lower = latest_height.saturating_sub(window).max(start_height.unwrap_or(0));

    let mut blocks = Vec::new();
    let mut start = end;
    while start >= interval {
        start -= interval;
        if start < lower {
            break;
        }
        let stop = start + interval;
        let hits: Vec<&HeartbeatTx> = heartbeats.iter().filter(|h| h.height >= start && h.height < stop).collect();

        let mut key_ids: Vec<String> = hits.iter().flat_map(|h| h.key_ids.iter().cloned()).collect();
        key_ids.sort();
        key_ids.dedup();
        let mut ineligibilities = BTreeMap::new();
        for h in &hits {
            for (k, v) in &h.ineligibilities {
                ineligibilities.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        blocks.push(HeartbeatBlock { height: start, up: !hits.is_empty(), key_ids, ineligibilities });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hb(height: u64) -> HeartbeatTx {
        HeartbeatTx { height, sender: "axelar1proxy".into(), ..Default::default() }
    }

    #[test]
    fn uptime_seven_of_ten() {
        assert_eq!(heartbeats_uptime(7, 10), 70.0);
        assert_eq!(heartbeats_uptime(0, 0), 0.0);
        assert_eq!(heartbeats_uptime(12, 10), 100.0);
    }

    #[test]
    fn aligned_complete_intervals() {
        // Latest 1020: the interval [1000, 1050) is incomplete and skipped.
        let blocks = heartbeat_blocks(1020, 200, 50, None, &[hb(951), hb(960), hb(852)]);
        assert_eq!(blocks.iter().map(|b| b.height).collect::<Vec<_>>(), vec![950, 900, 850]);
        assert_eq!(blocks.iter().map(|b| b.up).collect::<Vec<_>>(), vec![true, false, true]);
        let stats = HeartbeatStats::from_blocks(&blocks);
        assert_eq!(stats.up_heartbeats, 2);
        assert_eq!(stats.total_heartbeats, 3);
    }

    #[test]
    fn registration_height_bounds_the_window() {
        let blocks = heartbeat_blocks(1000, 500, 50, Some(880), &[]);
        assert_eq!(blocks.iter().map(|b| b.height).collect::<Vec<_>>(), vec![950, 900]);
        assert!(heartbeat_blocks(1000, 500, 0, None, &[]).is_empty());
    }

    #[test]
    fn key_ids_are_collected() {
        let mut a = hb(101);
        a.key_ids = vec!["k2".into(), "k1".into()];
        a.ineligibilities.insert("k3".into(), "missed".into());
        let mut b = hb(120);
        b.key_ids = vec!["k1".into()];
        let blocks = heartbeat_blocks(150, 50, 50, None, &[a, b]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].key_ids, vec!["k1".to_string(), "k2".to_string()]);
        assert_eq!(blocks[0].ineligibilities.get("k3").map(String::as_str), Some("missed"));
    }
}
