// EVM batch tracking: keep every open batch and the most recent terminal
// ones, re-poll only the stale ones.

use std::collections::{BTreeMap, VecDeque};

use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::{json, Value};

use axlscan_core::batches::{batch_from_value, merge_batch, needs_repoll};
use axlscan_core::{Batch, SearchQuery, SearchSource};

use crate::engine::fetchers::Fetchers;

pub const BATCHES_INDEX: &str = "batches";

/// Executed and aborted batches kept for display; older ones are evicted.
pub const MAX_TERMINAL_BATCHES: usize = 500;

type BatchKey = (String, String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPollReport {
    pub polled: usize,
    pub updated: usize,
    pub failed: usize,
    /// Terminal batches left out of this cycle.
    pub skipped: usize,
}

#[derive(Debug)]
pub struct BatchTracker {
    batches: BTreeMap<BatchKey, Batch>,
    /// Terminal batch keys, oldest first.
    terminal: VecDeque<BatchKey>,
    max_terminal: usize,
}

impl Default for BatchTracker {
    fn default() -> Self {
        Self::with_terminal_limit(MAX_TERMINAL_BATCHES)
    }
}

fn key(chain: &str, batch_id: &str) -> BatchKey {
    (chain.to_lowercase(), batch_id.to_string())
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terminal_limit(max_terminal: usize) -> Self {
        BatchTracker { batches: BTreeMap::new(), terminal: VecDeque::new(), max_terminal }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn get(&self, chain: &str, batch_id: &str) -> Option<&Batch> {
        self.batches.get(&key(chain, batch_id))
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    /// Insert or merge a batch. Returns true when something changed.
    pub fn track(&mut self, batch: Batch) -> bool {
        let k = key(&batch.chain, &batch.batch_id);
        let was_terminal = self.batches.get(&k).is_some_and(|b| !needs_repoll(b));
        let (merged, changed) = match self.batches.get(&k) {
            Some(known) => {
                let merged = merge_batch(known, batch);
                let changed = &merged != known;
                (merged, changed)
            }
            None => (batch, true),
        };
        let now_terminal = !needs_repoll(&merged);
        self.batches.insert(k.clone(), merged);
        if now_terminal && !was_terminal {
            self.terminal.push_back(k);
            self.evict();
        }
        changed
    }

    fn evict(&mut self) {
        while self.terminal.len() > self.max_terminal {
            let Some(oldest) = self.terminal.pop_front() else { break };
            if let Some(batch) = self.batches.remove(&oldest) {
                debug!("[batches] evicted {}/{}", batch.chain, batch.batch_id);
            }
        }
    }

    pub fn stale(&self) -> Vec<&Batch> {
        self.batches.values().filter(|b| needs_repoll(b)).collect()
    }

    /// Load the most recent batches, optionally for one chain.
    pub async fn load_recent(&mut self, search: &dyn SearchSource, chain: Option<&str>, size: u64) -> Option<usize> {
        let query = match chain {
            Some(c) => json!({ "match": { "chain": c.to_lowercase() } }),
            None => json!({ "match_all": {} }),
        };
        let q = SearchQuery::new(BATCHES_INDEX, query).size(size).sort(json!([{ "created_at.ms": "desc" }]));
        let response = match search.search(&q).await {
            Ok(r) => r,
            Err(e) => {
                warn!("[batches] recent batches unavailable: {}", e);
                return None;
            }
        };
        let mut loaded = 0;
        for doc in &response.data {
            let doc_chain = doc.get("chain").and_then(|c| c.as_str()).or(chain).unwrap_or_default();
            if let Some(batch) = batch_from_value(doc_chain, doc) {
                self.track(batch);
                loaded += 1;
            }
        }
        Some(loaded)
    }

    /// Re-fetch every stale batch concurrently and merge the results.
    /// Executed and aborted batches are never requested again.
    pub async fn poll(&mut self, search: &dyn SearchSource, lcd: Option<&Fetchers>) -> BatchPollReport {
        let stale: Vec<(String, String)> =
            self.stale().into_iter().map(|b| (b.chain.clone(), b.batch_id.clone())).collect();
        let mut report = BatchPollReport { polled: stale.len(), skipped: self.len() - stale.len(), ..Default::default() };

        let fetched = join_all(stale.iter().map(|(chain, id)| fetch_batch(search, lcd, chain, id))).await;
        for ((chain, id), batch) in stale.iter().zip(fetched) {
            match batch {
                Some(batch) => {
                    if self.track(batch) {
                        report.updated += 1;
                    }
                }
                None => {
                    debug!("[batches] {}/{} not available this round", chain, id);
                    report.failed += 1;
                }
            }
        }
        info!(
            "[batches] polled {} ({} updated, {} failed), {} terminal skipped",
            report.polled, report.updated, report.failed, report.skipped
        );
        report
    }
}

/// Search index first (it carries execution flags); LCD as a fallback.
async fn fetch_batch(search: &dyn SearchSource, lcd: Option<&Fetchers>, chain: &str, batch_id: &str) -> Option<Batch> {
    let query = json!({ "bool": { "must": [
        { "match": { "batch_id": batch_id } },
        { "match": { "chain": chain } }
    ] } });
    let q = SearchQuery::new(BATCHES_INDEX, query).size(1);
    let from_search = match search.search(&q).await {
        Ok(r) => r.data.first().and_then(|doc| batch_from_value(chain, doc)),
        Err(e) => {
            debug!("[batches] search lookup of {} failed: {}", batch_id, e);
            None
        }
    };
    if from_search.is_some() {
        return from_search;
    }
    let doc: Value = lcd?.batch(chain, batch_id).await?;
    batch_from_value(chain, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axlscan_core::{BatchStatus, Command};

    fn batch(id: &str, status: BatchStatus, executed: bool) -> Batch {
        Batch {
            batch_id: id.into(),
            chain: "ethereum".into(),
            status,
            commands: vec![Command { id: format!("{}-c", id), executed, ..Default::default() }],
        }
    }

    #[test]
    fn track_merges_and_reports_change() {
        let mut t = BatchTracker::new();
        assert!(t.track(batch("b1", BatchStatus::Signing, false)));
        assert!(!t.track(batch("b1", BatchStatus::Signing, false)));
        assert!(t.track(batch("b1", BatchStatus::Signed, true)));
        assert_eq!(t.len(), 1);
        assert!(t.stale().is_empty());
        assert_eq!(t.get("Ethereum", "b1").map(|b| b.status), Some(BatchStatus::Signed));
    }

    #[test]
    fn oldest_terminal_batches_are_evicted() {
        let mut t = BatchTracker::with_terminal_limit(2);
        t.track(batch("open", BatchStatus::Signing, false));
        for id in ["t1", "t2", "t3"] {
            t.track(batch(id, BatchStatus::Signed, true));
        }
        // Re-tracking a terminal batch does not count it twice.
        t.track(batch("t3", BatchStatus::Signed, true));

        assert_eq!(t.len(), 3);
        assert!(t.get("ethereum", "t1").is_none());
        assert!(t.get("ethereum", "t2").is_some() && t.get("ethereum", "t3").is_some());
        assert_eq!(t.stale().len(), 1);

        // Open batches stay no matter how many finish.
        t.track(batch("open", BatchStatus::Signed, true));
        assert_eq!(t.len(), 2);
        assert!(t.get("ethereum", "open").is_some());
        assert!(t.get("ethereum", "t2").is_none());
    }
}
