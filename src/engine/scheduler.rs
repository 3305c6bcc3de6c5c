// axlscan Engine: Scheduler
// Periodic polling decoupled from any UI lifecycle.
//
//   CancelToken:  cooperative stop signal shared by a view's tasks
//   FetchEpoch:   results apply only if no parameter change happened
//                 while the fetch was in flight
//   LoadMoreFlag: poll ticks are skipped while a manual "load more" runs
//   Poller:       interval loop over the three

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

// ── Cancellation ───────────────────────────────────────────────────────

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

#[derive(Clone, Default)]
pub struct CancelToken(Arc<CancelInner>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

// ── Fetch epochs ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTicket(u64);

#[derive(Clone, Default)]
pub struct FetchEpoch(Arc<AtomicU64>);

impl FetchEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a fetch starting now.
    pub fn begin(&self) -> EpochTicket {
        EpochTicket(self.0.load(Ordering::SeqCst))
    }

    /// Invalidate every in-flight fetch (parameters changed).
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: EpochTicket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

// ── Load-more suppression ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct LoadMoreFlag(Arc<AtomicBool>);

/// Held for the duration of a manual "load more"; clears the flag on drop.
pub struct LoadMoreGuard(Arc<AtomicBool>);

impl LoadMoreFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a load-more is already running.
    pub fn try_begin(&self) -> Option<LoadMoreGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LoadMoreGuard(self.0.clone()))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Drop for LoadMoreGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Poller ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub applied: u64,
    /// Fetch returned nothing; previous state kept.
    pub empty: u64,
    /// Result dropped because the epoch moved on.
    pub stale: u64,
    /// Tick skipped while a load-more was running.
    pub suppressed: u64,
}

#[derive(Clone)]
pub struct Poller {
    name: String,
    interval: Duration,
    token: CancelToken,
    epoch: FetchEpoch,
    load_more: LoadMoreFlag,
}

impl Poller {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Poller {
            name: name.into(),
            interval,
            token: CancelToken::new(),
            epoch: FetchEpoch::new(),
            load_more: LoadMoreFlag::new(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn epoch(&self) -> FetchEpoch {
        self.epoch.clone()
    }

    pub fn load_more(&self) -> LoadMoreFlag {
        self.load_more.clone()
    }

    /// Run until cancelled. `fetch` is called on every tick (the first tick
    /// fires immediately); `apply` receives results whose epoch is still
    /// current. A `None` result leaves the previous state untouched.
    pub async fn run<T, F, Fut, A>(&self, mut fetch: F, mut apply: A) -> PollStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
        A: FnMut(T),
    {
        let mut stats = PollStats::default();
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("[poller] {} started, every {:?}", self.name, self.interval);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            stats.ticks += 1;

            if self.load_more.is_active() {
                stats.suppressed += 1;
                debug!("[poller] {} tick suppressed during load-more", self.name);
                continue;
            }

            let ticket = self.epoch.begin();
            let result = tokio::select! {
                _ = self.token.cancelled() => break,
                r = fetch() => r,
            };

            if self.token.is_cancelled() {
                break;
            }
            if !self.epoch.is_current(ticket) {
                stats.stale += 1;
                debug!("[poller] {} dropped a stale result", self.name);
                continue;
            }
            match result {
                Some(value) => {
                    apply(value);
                    stats.applied += 1;
                }
                None => stats.empty += 1,
            }
        }

        info!("[poller] {} stopped after {} ticks", self.name, stats.ticks);
        stats
    }
}
