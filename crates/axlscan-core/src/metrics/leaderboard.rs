// Leaderboard scoring.
//
// Seven participation fractions per validator are each normalized against
// the largest value observed in the range, weighted, and summed. Rows are
// ordered by score with a deterministic tie-break and share a rank when the
// scores are exactly equal (1, 1, 3).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    SupportedChains,
    Vote,
    Keygen,
    Sign,
    Heartbeats,
    Uptime,
    Jailed,
}

impl LeaderboardMetric {
    /// Weight order, which is also the tie-break order.
    pub const ALL: [LeaderboardMetric; 7] = [
        LeaderboardMetric::SupportedChains,
        LeaderboardMetric::Vote,
        LeaderboardMetric::Keygen,
        LeaderboardMetric::Sign,
        LeaderboardMetric::Heartbeats,
        LeaderboardMetric::Uptime,
        LeaderboardMetric::Jailed,
    ];

    pub fn weight(self) -> f64 {
        match self {
            LeaderboardMetric::SupportedChains => 0.3,
            LeaderboardMetric::Vote => 0.2,
            _ => 0.1,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            LeaderboardMetric::SupportedChains => "supported_chains_fraction",
            LeaderboardMetric::Vote => "vote_participation_fraction",
            LeaderboardMetric::Keygen => "keygen_participation_fraction",
            LeaderboardMetric::Sign => "sign_participation_fraction",
            LeaderboardMetric::Heartbeats => "heartbeats_fraction",
            LeaderboardMetric::Uptime => "uptime_fraction",
            LeaderboardMetric::Jailed => "jailed_fraction",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardFractions {
    pub supported_chains_fraction: f64,
    pub vote_participation_fraction: f64,
    pub keygen_participation_fraction: f64,
    pub sign_participation_fraction: f64,
    pub heartbeats_fraction: f64,
    pub uptime_fraction: f64,
    /// Share of snapshots in which the validator was not jailed.
    pub jailed_fraction: f64,
}

impl LeaderboardFractions {
    pub fn get(&self, metric: LeaderboardMetric) -> f64 {
        match metric {
            LeaderboardMetric::SupportedChains => self.supported_chains_fraction,
            LeaderboardMetric::Vote => self.vote_participation_fraction,
            LeaderboardMetric::Keygen => self.keygen_participation_fraction,
            LeaderboardMetric::Sign => self.sign_participation_fraction,
            LeaderboardMetric::Heartbeats => self.heartbeats_fraction,
            LeaderboardMetric::Uptime => self.uptime_fraction,
            LeaderboardMetric::Jailed => self.jailed_fraction,
        }
    }

    fn set(&mut self, metric: LeaderboardMetric, value: f64) {
        let slot = match metric {
            LeaderboardMetric::SupportedChains => &mut self.supported_chains_fraction,
            LeaderboardMetric::Vote => &mut self.vote_participation_fraction,
            LeaderboardMetric::Keygen => &mut self.keygen_participation_fraction,
            LeaderboardMetric::Sign => &mut self.sign_participation_fraction,
            LeaderboardMetric::Heartbeats => &mut self.heartbeats_fraction,
            LeaderboardMetric::Uptime => &mut self.uptime_fraction,
            LeaderboardMetric::Jailed => &mut self.jailed_fraction,
        };
        *slot = if value.is_finite() { value } else { 0.0 };
    }
}

// ── Snapshot aggregation ───────────────────────────────────────────────────

/// Participation of one validator at one snapshot block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotValidator {
    pub operator_address: String,
    pub snapshot_height: u64,
    pub supported_chains: u64,
    pub total_chains: u64,
    pub votes: u64,
    pub total_polls: u64,
    pub keygens: u64,
    pub total_keygens: u64,
    pub signs: u64,
    pub total_signs: u64,
    pub heartbeats: u64,
    pub total_heartbeats: u64,
    /// Percentage in [0, 100].
    pub uptime: f64,
    pub jailed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardInput {
    pub operator_address: String,
    pub snapshots: u64,
    pub fractions: LeaderboardFractions,
}

#[derive(Default)]
struct Totals {
    snapshots: u64,
    chains_ratio_sum: f64,
    votes: (u64, u64),
    keygens: (u64, u64),
    signs: (u64, u64),
    heartbeats: (u64, u64),
    uptime_sum: f64,
    not_jailed: u64,
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64).min(1.0)
    }
}

/// Collapse snapshot rows in `[from, to]` into one input per validator.
/// Counts are pooled across snapshots; chain support and uptime are averaged.
pub fn aggregate_snapshots(records: &[SnapshotValidator], from: u64, to: u64) -> Vec<LeaderboardInput> {
    let mut by_operator: BTreeMap<&str, Totals> = BTreeMap::new();
    for r in records.iter().filter(|r| r.snapshot_height >= from && r.snapshot_height <= to) {
        if r.operator_address.is_empty() {
            continue;
        }
        let t = by_operator.entry(r.operator_address.as_str()).or_default();
        t.snapshots += 1;
        t.chains_ratio_sum += ratio(r.supported_chains, r.total_chains);
        t.votes = (t.votes.0 + r.votes, t.votes.1 + r.total_polls);
        t.keygens = (t.keygens.0 + r.keygens, t.keygens.1 + r.total_keygens);
        t.signs = (t.signs.0 + r.signs, t.signs.1 + r.total_signs);
        t.heartbeats = (t.heartbeats.0 + r.heartbeats, t.heartbeats.1 + r.total_heartbeats);
        t.uptime_sum += r.uptime.clamp(0.0, 100.0);
        if !r.jailed {
            t.not_jailed += 1;
        }
    }

    by_operator
        .into_iter()
        .map(|(operator, t)| {
            let n = t.snapshots as f64;
            LeaderboardInput {
                operator_address: operator.to_string(),
                snapshots: t.snapshots,
                fractions: LeaderboardFractions {
                    supported_chains_fraction: t.chains_ratio_sum / n,
                    vote_participation_fraction: ratio(t.votes.0, t.votes.1),
                    keygen_participation_fraction: ratio(t.keygens.0, t.keygens.1),
                    sign_participation_fraction: ratio(t.signs.0, t.signs.1),
                    heartbeats_fraction: ratio(t.heartbeats.0, t.heartbeats.1),
                    uptime_fraction: t.uptime_sum / n / 100.0,
                    jailed_fraction: t.not_jailed as f64 / n,
                },
            }
        })
        .collect()
}

// ── Scoring ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub operator_address: String,
    pub snapshots: u64,
    pub fractions: LeaderboardFractions,
    pub normalized: LeaderboardFractions,
    pub score: f64,
    pub rank: usize,
}

fn tie_break(a: &LeaderboardRow, b: &LeaderboardRow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            LeaderboardMetric::ALL
                .iter()
                .map(|m| b.fractions.get(*m).total_cmp(&a.fractions.get(*m)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.operator_address.cmp(&b.operator_address))
}

pub fn score_leaderboard(inputs: Vec<LeaderboardInput>) -> Vec<LeaderboardRow> {
    let mut max = LeaderboardFractions::default();
    for metric in LeaderboardMetric::ALL {
        let highest = inputs.iter().map(|i| i.fractions.get(metric)).fold(0.0_f64, f64::max);
        max.set(metric, highest);
    }

    let mut rows: Vec<LeaderboardRow> = inputs
        .into_iter()
        .map(|input| {
            let mut normalized = LeaderboardFractions::default();
            let mut score = 0.0;
            for metric in LeaderboardMetric::ALL {
                let top = max.get(metric);
                let value = if top > 0.0 { input.fractions.get(metric) / top } else { 0.0 };
                normalized.set(metric, value);
                score += metric.weight() * normalized.get(metric);
            }
            LeaderboardRow {
                operator_address: input.operator_address,
                snapshots: input.snapshots,
                fractions: input.fractions,
                normalized,
                score,
                rank: 0,
            }
        })
        .collect();

    rows.sort_by(tie_break);

    let mut previous: Option<(f64, usize)> = None;
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = match previous {
            Some((score, rank)) if score == row.score => rank,
            _ => i + 1,
        };
        previous = Some((row.score, row.rank));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(op: &str, f: [f64; 7]) -> LeaderboardInput {
        LeaderboardInput {
            operator_address: op.into(),
            snapshots: 1,
            fractions: LeaderboardFractions {
                supported_chains_fraction: f[0],
                vote_participation_fraction: f[1],
                keygen_participation_fraction: f[2],
                sign_participation_fraction: f[3],
                heartbeats_fraction: f[4],
                uptime_fraction: f[5],
                jailed_fraction: f[6],
            },
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = LeaderboardMetric::ALL.iter().map(|m| m.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn competition_ranking() {
        let rows = score_leaderboard(vec![
            input("c", [0.5; 7]),
            input("a", [1.0; 7]),
            input("b", [1.0; 7]),
            input("d", [0.0; 7]),
        ]);
        let ranks: Vec<(&str, usize)> = rows.iter().map(|r| (r.operator_address.as_str(), r.rank)).collect();
        assert_eq!(ranks, vec![("a", 1), ("b", 1), ("c", 3), ("d", 4)]);
        assert!((rows[0].score - 1.0).abs() < 1e-12);
        assert_eq!(rows[3].score, 0.0);
    }

    #[test]
    fn rank_follows_score() {
        let rows = score_leaderboard(vec![
            input("x", [0.9, 0.1, 0.3, 0.3, 0.9, 0.99, 1.0]),
            input("y", [0.2, 1.0, 0.5, 0.5, 0.8, 0.95, 1.0]),
            input("z", [0.9, 0.1, 0.3, 0.3, 0.9, 0.99, 1.0]),
            input("w", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ]);
        for a in &rows {
            for b in &rows {
                if a.score > b.score {
                    assert!(a.rank < b.rank);
                } else if a.score == b.score {
                    assert_eq!(a.rank, b.rank);
                }
            }
        }
    }

    #[test]
    fn zero_max_normalizes_to_zero() {
        let rows = score_leaderboard(vec![input("a", [0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0])]);
        assert_eq!(rows[0].normalized.supported_chains_fraction, 0.0);
        assert_eq!(rows[0].normalized.vote_participation_fraction, 1.0);
        assert!((rows[0].score - 0.2).abs() < 1e-12);
    }

    #[test]
    fn snapshots_outside_range_are_ignored() {
        let row = |h: u64, jailed: bool| SnapshotValidator {
            operator_address: "axelarvaloper1a".into(),
            snapshot_height: h,
            supported_chains: 3,
            total_chains: 4,
            votes: 9,
            total_polls: 10,
            uptime: 90.0,
            jailed,
            ..Default::default()
        };
        let inputs = aggregate_snapshots(&[row(100, false), row(200, true), row(300, false)], 100, 200);
        assert_eq!(inputs.len(), 1);
        let f = inputs[0].fractions;
        assert_eq!(inputs[0].snapshots, 2);
        assert_eq!(f.supported_chains_fraction, 0.75);
        assert_eq!(f.vote_participation_fraction, 0.9);
        assert_eq!(f.jailed_fraction, 0.5);
        assert!((f.uptime_fraction - 0.9).abs() < 1e-12);
        assert_eq!(f.keygen_participation_fraction, 0.0);
    }
}
