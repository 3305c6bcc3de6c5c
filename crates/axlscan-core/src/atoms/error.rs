// ── axlscan Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for core and engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (network, backend API, config…).
//   • Per-record decode problems never become errors: decoders degrade to
//     `None` / empty results instead. Only whole-request failures land here.
//   • `PaginationLimit` is the one "soft" condition that is still surfaced,
//     so a backend that never stops returning cursors is visible to callers.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScanError {
    /// Filesystem or OS-level I/O failure (config and reference files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A backend answered, but with a non-success status or an error body.
    #[error("API error: {source_name}: {message}")]
    Api { source_name: String, message: String },

    /// Circuit breaker is open for this backend.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response could not be interpreted at all.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The backend kept returning a pagination cursor past the iteration cap.
    #[error("Pagination limit reached: {resource} still had a cursor after {pages} pages")]
    PaginationLimit { resource: String, pages: usize },

    /// The owning task was cancelled before the result could be applied.
    #[error("Cancelled")]
    Cancelled,

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl ScanError {
    /// Create an API error with backend name and message.
    pub fn api(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api { source_name: source_name.into(), message: message.into() }
    }

    /// True for failures that should be treated as "no update this round".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api { .. } | Self::Unavailable(_) | Self::Decode(_))
    }
}

impl From<String> for ScanError {
    fn from(s: String) -> Self {
        ScanError::Other(s)
    }
}

impl From<&str> for ScanError {
    fn from(s: &str) -> Self {
        ScanError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible operations in the workspace return this type.
pub type ScanResult<T> = Result<T, ScanError>;

// ── Conversion: ScanError → String ─────────────────────────────────────────

impl From<ScanError> for String {
    fn from(e: ScanError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ScanError::api("lcd", "HTTP 502").is_transient());
        assert!(ScanError::Unavailable("lcd".into()).is_transient());
        assert!(!ScanError::Config("bad".into()).is_transient());
        assert!(!ScanError::PaginationLimit { resource: "x".into(), pages: 3 }.is_transient());
    }

    #[test]
    fn display_messages() {
        let e = ScanError::PaginationLimit { resource: "validators".into(), pages: 10 };
        assert_eq!(
            e.to_string(),
            "Pagination limit reached: validators still had a cursor after 10 pages"
        );
        let s: String = ScanError::api("search", "HTTP 500").into();
        assert_eq!(s, "API error: search: HTTP 500");
    }
}
