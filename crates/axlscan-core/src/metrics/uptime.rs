// Block-signing uptime.

use serde::{Deserialize, Serialize};

use super::clamp_percent;
use crate::atoms::types::{SlashingParams, UptimeBlock};

/// `signed * 100 / window`, clamped to [0, 100]. An empty window is 0.
pub fn uptime_percent(signed: u64, window: u64) -> f64 {
    if window == 0 {
        return 0.0;
    }
    clamp_percent(signed as f64 * 100.0 / window as f64)
}

/// A sampled block and the consensus addresses that signed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedBlock {
    pub height: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub signers: Vec<String>,
}

/// Per-block up/down series of one consensus address, ascending by height.
pub fn uptime_series(consensus_address: &str, blocks: &[SignedBlock]) -> Vec<UptimeBlock> {
    let mut series: Vec<UptimeBlock> = blocks
        .iter()
        .map(|b| UptimeBlock {
            height: b.height,
            timestamp: b.timestamp,
            up: b.signers.iter().any(|s| s.eq_ignore_ascii_case(consensus_address)),
        })
        .collect();
    series.sort_by_key(|b| b.height);
    series.dedup_by_key(|b| b.height);
    series
}

/// Uptime over a trailing window of `window` blocks.
pub fn uptime_from_series(series: &[UptimeBlock], window: u64) -> f64 {
    let signed = series.iter().filter(|b| b.up).count() as u64;
    uptime_percent(signed, window)
}

/// Uptime from slashing signing info when no block sample is available:
/// the share of the signing window that was not missed.
pub fn uptime_from_signing_info(missed_blocks_counter: u64, params: &SlashingParams) -> Option<f64> {
    let window = params.signed_blocks_window;
    if window == 0 {
        return None;
    }
    Some(uptime_percent(window.saturating_sub(missed_blocks_counter), window))
}
