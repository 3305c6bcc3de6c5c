// ── axlscan Atoms Layer ────────────────────────────────────────────────────
// Constants, error types, plain data types and backend traits.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from the decoder or metrics modules; the paging
// request/page types are the only shared dependency of the traits.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
