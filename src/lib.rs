// axlscan: data-aggregation engine for an Axelar / Cosmos-SDK explorer.
// Pure types and derivations come from `axlscan-core`; this crate adds the
// HTTP clients, fetchers, aggregators and the polling scheduler.

pub mod engine;

pub use axlscan_core;
pub use engine::config::ExplorerConfig;
pub use engine::explorer::Explorer;
