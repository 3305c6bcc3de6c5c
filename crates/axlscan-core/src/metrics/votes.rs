// EVM poll vote tally per source chain.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// A poll opened in the window (one per cross-chain event to confirm).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmPoll {
    pub poll_id: String,
    pub chain: String,
    pub height: u64,
}

/// One vote cast by a broadcaster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmVote {
    pub poll_id: String,
    pub chain: String,
    pub voter: String,
    /// `true` confirms the event, `false` rejects it.
    pub vote: bool,
    pub height: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVoteTally {
    pub confirmed: u64,
    pub rejected: u64,
    pub unsubmitted: u64,
    pub total_polls: u64,
}

impl ChainVoteTally {
    fn add(&mut self, other: &ChainVoteTally) {
        self.confirmed += other.confirmed;
        self.rejected += other.rejected;
        self.unsubmitted += other.unsubmitted;
        self.total_polls += other.total_polls;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Keyed by lowercase chain id.
    pub chains: BTreeMap<String, ChainVoteTally>,
    pub total: ChainVoteTally,
}

/// Tally the votes of `broadcaster` against the polls opened in the window.
/// Duplicate votes on one poll count once (first wins); `unsubmitted` is
/// the poll count minus confirmed and rejected, never below zero.
pub fn tally_votes(broadcaster: &str, polls: &[EvmPoll], votes: &[EvmVote]) -> VoteTally {
    let mut chains: BTreeMap<String, ChainVoteTally> = BTreeMap::new();

    let mut seen_polls = HashSet::new();
    for poll in polls {
        if seen_polls.insert(poll.poll_id.as_str()) {
            chains.entry(poll.chain.to_lowercase()).or_default().total_polls += 1;
        }
    }

    let mut seen_votes = HashSet::new();
    for vote in votes.iter().filter(|v| v.voter.eq_ignore_ascii_case(broadcaster)) {
        if !seen_votes.insert(vote.poll_id.as_str()) {
            continue;
        }
        let entry = chains.entry(vote.chain.to_lowercase()).or_default();
        if vote.vote {
            entry.confirmed += 1;
        } else {
            entry.rejected += 1;
        }
    }

    let mut total = ChainVoteTally::default();
    for tally in chains.values_mut() {
        tally.unsubmitted = tally.total_polls.saturating_sub(tally.confirmed + tally.rejected);
        total.add(tally);
    }
    VoteTally { chains, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id: &str, chain: &str) -> EvmPoll {
        EvmPoll { poll_id: id.into(), chain: chain.into(), height: 1 }
    }

    fn vote(id: &str, chain: &str, voter: &str, yes: bool) -> EvmVote {
        EvmVote { poll_id: id.into(), chain: chain.into(), voter: voter.into(), vote: yes, height: 2 }
    }

    #[test]
    fn tally_per_chain() {
        let polls = vec![poll("1", "ethereum"), poll("2", "Ethereum"), poll("3", "avalanche"), poll("3", "avalanche")];
        let votes = vec![
            vote("1", "ethereum", "axelar1me", true),
            vote("1", "ethereum", "axelar1me", false),
            vote("3", "avalanche", "AXELAR1ME", false),
            vote("2", "ethereum", "axelar1other", true),
        ];
        let t = tally_votes("axelar1me", &polls, &votes);
        let eth = t.chains["ethereum"];
        assert_eq!((eth.confirmed, eth.rejected, eth.unsubmitted, eth.total_polls), (1, 0, 1, 2));
        let avax = t.chains["avalanche"];
        assert_eq!((avax.confirmed, avax.rejected, avax.unsubmitted), (0, 1, 0));
        assert_eq!(t.total.total_polls, 3);
        assert_eq!(t.total.unsubmitted, 1);
    }

    #[test]
    fn unsubmitted_never_negative() {
        let votes = vec![vote("9", "polygon", "axelar1me", true)];
        let t = tally_votes("axelar1me", &[], &votes);
        assert_eq!(t.chains["polygon"].unsubmitted, 0);
        assert_eq!(t.chains["polygon"].confirmed, 1);
    }
}
