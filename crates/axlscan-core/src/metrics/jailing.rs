// Jailing history from a per-block up/down series.

use serde::{Deserialize, Serialize};

use crate::atoms::constants::NO_RECOVERY_SENTINEL;
use crate::atoms::types::{SlashingParams, UptimeBlock};

/// Consecutive missed blocks tolerated before a validator counts as jailed:
/// `window - min_signed * window` from the slashing params, or `fallback`
/// when the params are missing or degenerate.
pub fn max_missed_blocks(params: Option<&SlashingParams>, fallback: u64) -> u64 {
    match params {
        Some(p) if p.signed_blocks_window > 0 && p.min_signed_per_window.is_finite() => {
            let window = p.signed_blocks_window as f64;
            let min_signed = p.min_signed_per_window.clamp(0.0, 1.0);
            (window - min_signed * window).floor() as u64
        }
        _ => fallback,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JailEpisode {
    /// Block at which the missed streak first exceeded the threshold.
    pub start_height: u64,
    pub start_timestamp: i64,
    /// First block seen up again, if any.
    pub recovered_height: Option<u64>,
    /// Milliseconds from `start_timestamp` to recovery.
    pub response_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JailingHistory {
    pub times_jailed: u64,
    /// Mean recovery time in ms over recovered episodes. `0` when never
    /// jailed, `-1` when jailed but never recovered.
    pub avg_jail_response_time: i64,
    pub episodes: Vec<JailEpisode>,
}

pub fn jailing_history(series: &[UptimeBlock], max_missed: u64) -> JailingHistory {
    let mut ordered: Vec<&UptimeBlock> = series.iter().collect();
    ordered.sort_by_key(|b| b.height);

    let mut episodes: Vec<JailEpisode> = Vec::new();
    let mut streak = 0u64;
    let mut open: Option<JailEpisode> = None;

    for block in ordered {
        if block.up {
            if let Some(mut episode) = open.take() {
                episode.recovered_height = Some(block.height);
                episode.response_time = Some((block.timestamp - episode.start_timestamp).max(0));
                episodes.push(episode);
            }
            streak = 0;
            continue;
        }
        streak += 1;
        if streak > max_missed && open.is_none() {
            open = Some(JailEpisode {
                start_height: block.height,
                start_timestamp: block.timestamp,
                recovered_height: None,
                response_time: None,
            });
        }
    }
    episodes.extend(open);

    let recovered: Vec<i64> = episodes.iter().filter_map(|e| e.response_time).collect();
    let avg_jail_response_time = if episodes.is_empty() {
        0
    } else if recovered.is_empty() {
        NO_RECOVERY_SENTINEL
    } else {
        (recovered.iter().sum::<i64>() as f64 / recovered.len() as f64).round() as i64
    };

    JailingHistory { times_jailed: episodes.len() as u64, avg_jail_response_time, episodes }
}
