// axlscan core: validator metrics
// Pure derivations over block samples, heartbeat intervals, EVM polls and
// leaderboard snapshots. The engine aggregators fetch the inputs; nothing in
// here performs I/O.

pub mod heartbeat;
pub mod jailing;
pub mod leaderboard;
pub mod uptime;
pub mod votes;

pub use heartbeat::{heartbeat_blocks, heartbeats_uptime, HeartbeatStats, HeartbeatTx};
pub use jailing::{jailing_history, max_missed_blocks, JailEpisode, JailingHistory};
pub use leaderboard::{
    aggregate_snapshots, score_leaderboard, LeaderboardFractions, LeaderboardInput, LeaderboardMetric,
    LeaderboardRow, SnapshotValidator,
};
pub use uptime::{uptime_from_series, uptime_from_signing_info, uptime_percent, uptime_series, SignedBlock};
pub use votes::{tally_votes, ChainVoteTally, EvmPoll, EvmVote, VoteTally};

/// Clamp a percentage into [0, 100], mapping NaN to 0.
pub(crate) fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
