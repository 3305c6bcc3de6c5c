// axlscan Engine
// I/O side of the explorer: HTTP clients for the LCD, search index and CLI
// proxy, paginated fetchers, aggregators and the polling scheduler. All
// derivation logic lives in `axlscan-core`.

pub mod aggregators;
pub mod cli_proxy;
pub mod config;
pub mod context;
pub mod explorer;
pub mod fetchers;
pub mod http;
pub mod lcd;
pub mod scheduler;
pub mod search;
