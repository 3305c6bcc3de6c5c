// axlscan Engine: aggregators
// Multi-source assembly of validator records, per-validator metrics,
// leaderboard rows and EVM batch tracking. Each aggregator takes its
// sources and a reference snapshot explicitly.

pub mod batches;
pub mod leaderboard;
pub mod profile;
pub mod validators;

pub use batches::{BatchPollReport, BatchTracker};
pub use leaderboard::leaderboard;
pub use profile::{validator_profile, ProfileWindows, ValidatorMetrics};
pub use validators::{load_validators, merge_validators, ValidatorSources};
