// axlscan-core: pure data types and derivation logic for the axlscan explorer.
//
// No network I/O happens here. The engine in the root crate implements the
// source traits in `atoms::traits` and feeds raw JSON into these modules.

pub mod address;
pub mod atoms;
pub mod batches;
pub mod denoms;
pub mod metrics;
pub mod paging;
pub mod resolvers;
pub mod tx;

pub use atoms::error::{ScanError, ScanResult};
pub use atoms::traits::{CliSource, LcdSource, SearchSource};
pub use atoms::types::*;
pub use denoms::DenomRegistry;
pub use resolvers::{ChainResolver, ValidatorResolver};
