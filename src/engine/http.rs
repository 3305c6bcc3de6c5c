// ── axlscan Engine: HTTP Retry, Circuit Breaker & JSON Endpoints ───────────
//
// Shared transport used by the LCD, search-index and CLI-proxy clients.
//
// Features:
//   • Exponential backoff with ±25% jitter (base 500ms, max 10s, 2 retries)
//   • Retry on 429 (rate limit), 500, 502, 503, 504 and on connect/timeouts
//   • `Retry-After` honoured up to 60s
//   • Circuit breaker per backend: 5 consecutive failures → fail fast for 30s
//   • One pooled `reqwest::Client` per backend with connect/request timeouts

use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axlscan_core::{ScanError, ScanResult};

// ── Constants ──────────────────────────────────────────────────────────────

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 2;

/// Initial retry delay in milliseconds (doubles each attempt).
const INITIAL_RETRY_DELAY_MS: u64 = 500;

/// Maximum retry delay cap in milliseconds.
const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Consecutive failures before a backend's circuit opens.
pub const CIRCUIT_THRESHOLD: u32 = 5;

/// Seconds a tripped circuit rejects requests.
pub const CIRCUIT_COOLDOWN_SECS: u64 = 30;

// ── Retryable status detection ─────────────────────────────────────────────

/// Rate limits and gateway errors; other 4xx/5xx answers are final.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

// ── Backoff delay ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_retries: MAX_RETRIES, initial_delay_ms: INITIAL_RETRY_DELAY_MS, max_delay_ms: MAX_RETRY_DELAY_MS }
    }
}

impl RetryPolicy {
    /// No retries at all; used by tests and one-shot CLI calls.
    pub fn none() -> Self {
        RetryPolicy { max_retries: 0, ..Default::default() }
    }

    /// Backoff for `attempt` (0-based). A server-sent Retry-After is honoured
    /// up to 60s, floored at the computed backoff.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let base_ms = self.initial_delay_ms.saturating_mul(2u64.saturating_pow(attempt.min(16)));
        let capped_ms = base_ms.min(self.max_delay_ms);
        let delay_ms = match retry_after_secs {
            Some(secs) => (secs.min(60) * 1000).max(capped_ms),
            None => capped_ms,
        };
        Duration::from_millis(apply_jitter(delay_ms))
    }
}

/// ±25% of `base_ms`, never below 1ms.
fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms;
    }
    let offset = (rand_jitter() % (2 * jitter_range + 1)) - jitter_range;
    (base_ms as i64 + offset).max(1) as u64
}

/// Jitter source from system clock nanos.
fn rand_jitter() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as i64
}

// ── Retry-After header parsing ─────────────────────────────────────────────

/// `Retry-After` in whole seconds. HTTP-date values are ignored.
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}

// ── Circuit Breaker ────────────────────────────────────────────────────────

/// Per-backend failure counter. At `threshold` consecutive failures the
/// backend is reported `Unavailable` until `cooldown_secs` have passed; the
/// next request after that is a trial, and one success closes it again.
pub struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    /// Epoch secs when the circuit was tripped open.
    tripped_at: AtomicU64,
    threshold: u32,
    cooldown_secs: u64,
}

impl CircuitBreaker {
    pub const fn new(threshold: u32, cooldown_secs: u64) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            tripped_at: AtomicU64::new(0),
            threshold,
            cooldown_secs,
        }
    }

    /// `Err(Unavailable)` while the circuit is open.
    pub fn check(&self, backend: &str) -> ScanResult<()> {
        let failures = self.consecutive_failures.load(Ordering::Relaxed);
        if failures < self.threshold {
            return Ok(());
        }
        let tripped = self.tripped_at.load(Ordering::Relaxed);
        let elapsed = now_secs().saturating_sub(tripped);
        if elapsed < self.cooldown_secs {
            Err(ScanError::Unavailable(format!(
                "{}: {} consecutive failures, cooling down for {}s",
                backend,
                failures,
                self.cooldown_secs - elapsed
            )))
        } else {
            Ok(())
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.tripped_at.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self, backend: &str) {
        let prev = self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        if prev + 1 >= self.threshold {
            self.tripped_at.store(now_secs(), Ordering::Relaxed);
            warn!(
                "[circuit-breaker] {} tripped after {} consecutive failures, cooling down {}s",
                backend,
                prev + 1,
                self.cooldown_secs
            );
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CIRCUIT_THRESHOLD, CIRCUIT_COOLDOWN_SECS)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Client factory ─────────────────────────────────────────────────────────

pub fn build_client(timeout_secs: u64) -> ScanResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(concat!("axlscan/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ScanError::from)
}

// ── JSON endpoint ──────────────────────────────────────────────────────────

/// A JSON backend at `base_url` with its own retry policy and breaker.
#[derive(Clone)]
pub struct JsonEndpoint {
    name: String,
    base_url: String,
    client: Client,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl JsonEndpoint {
    pub fn new(name: impl Into<String>, base_url: &str, client: Client, policy: RetryPolicy) -> Self {
        JsonEndpoint {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
            breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Arc::new(breaker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn get(&self, path: &str, params: &[(String, String)]) -> ScanResult<Value> {
        let url = self.url(path);
        self.send_with_retry(|| self.client.get(&url).query(params)).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ScanResult<Value> {
        let url = self.url(path);
        self.send_with_retry(|| self.client.post(&url).json(body)).await
    }

    async fn send_with_retry<F>(&self, build: F) -> ScanResult<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        self.breaker.check(&self.name)?;

        let mut attempt = 0u32;
        loop {
            let (err, retry_after) = match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp.json::<Value>().await.map_err(|e| {
                            ScanError::Decode(format!("{}: invalid JSON body: {}", self.name, e))
                        });
                        match body {
                            Ok(v) => {
                                self.breaker.record_success();
                                return Ok(v);
                            }
                            Err(e) => {
                                self.breaker.record_failure(&self.name);
                                return Err(e);
                            }
                        }
                    }

                    let retry_after = resp
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    let text = resp.text().await.unwrap_or_default();
                    let err = ScanError::api(&self.name, format!("HTTP {}: {}", status.as_u16(), truncate(&text, 200)));
                    if !is_retryable_status(status.as_u16()) {
                        // The backend answered; a 4xx is not a sign of an unhealthy backend.
                        return Err(err);
                    }
                    (err, retry_after)
                }
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => (ScanError::Network(e), None),
                Err(e) => {
                    self.breaker.record_failure(&self.name);
                    return Err(ScanError::Network(e));
                }
            };

            if attempt >= self.policy.max_retries {
                self.breaker.record_failure(&self.name);
                warn!("[{}] giving up after {} attempt(s): {}", self.name, attempt + 1, err);
                return Err(err);
            }
            let delay = self.policy.delay_for(attempt, retry_after);
            debug!("[{}] attempt {} failed ({}), retrying in {:?}", self.name, attempt + 1, err, delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for s in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(s));
        }
        for s in [200, 400, 401, 403, 404] {
            assert!(!is_retryable_status(s));
        }
    }

    #[test]
    fn parse_retry_after_valid() {
        assert_eq!(parse_retry_after("5"), Some(5));
        assert_eq!(parse_retry_after(" 30 "), Some(30));
        assert_eq!(parse_retry_after("not-a-number"), None);
    }

    #[test]
    fn jitter_stays_in_range() {
        for base in [100, 1000, 5000, 10_000] {
            let result = apply_jitter(base);
            let lower = (base as f64 * 0.74) as u64;
            let upper = (base as f64 * 1.26) as u64;
            assert!(result >= lower && result <= upper, "jitter({}) = {}", base, result);
        }
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(20, None) <= Duration::from_millis(12_500));
        assert!(policy.delay_for(0, Some(3)) >= Duration::from_millis(2_250));
    }

    #[test]
    fn circuit_breaker_trips_and_recovers() {
        let cb = CircuitBreaker::new(3, 60);
        assert!(cb.check("lcd").is_ok());
        cb.record_failure("lcd");
        cb.record_failure("lcd");
        assert!(cb.check("lcd").is_ok());
        cb.record_failure("lcd");
        assert!(matches!(cb.check("lcd"), Err(ScanError::Unavailable(_))));
        cb.record_success();
        assert!(cb.check("lcd").is_ok());
    }

    #[test]
    fn endpoint_urls() {
        let client = build_client(5).unwrap();
        let e = JsonEndpoint::new("lcd", "https://lcd.example.com/", client, RetryPolicy::none());
        assert_eq!(e.url("/cosmos/bank/v1beta1/balances/x"), "https://lcd.example.com/cosmos/bank/v1beta1/balances/x");
        assert_eq!(e.url(""), "https://lcd.example.com");
    }
}
