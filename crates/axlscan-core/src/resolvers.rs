// axlscan core: chain and validator resolvers
// Lookup helpers from ids / addresses to display metadata.

use std::collections::HashMap;

use crate::atoms::types::{ChainEntry, ValidatorProfile};

// ── Chains ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ChainResolver {
    chains: Vec<ChainEntry>,
}

impl ChainResolver {
    pub fn new(chains: Vec<ChainEntry>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &[ChainEntry] {
        &self.chains
    }

    /// Match on `id` or display `name`, case-insensitively.
    pub fn chain(&self, id: &str) -> Option<&ChainEntry> {
        let id = id.trim();
        self.chains
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id) || c.name.eq_ignore_ascii_case(id))
    }

    pub fn image(&self, id: &str) -> Option<&str> {
        self.chain(id).and_then(|c| c.image.as_deref())
    }

    pub fn name<'a>(&'a self, id: &'a str) -> &'a str {
        self.chain(id).map(|c| c.name.as_str()).filter(|n| !n.is_empty()).unwrap_or(id)
    }

    pub fn explorer_tx_url(&self, id: &str, hash: &str) -> Option<String> {
        let explorer = self.chain(id)?.explorer.as_ref()?;
        if explorer.url.is_empty() {
            return None;
        }
        let path = if explorer.transaction_path.is_empty() { "/tx/{tx}" } else { &explorer.transaction_path };
        Some(format!("{}{}", explorer.url.trim_end_matches('/'), path.replace("{tx}", hash)))
    }

    pub fn explorer_address_url(&self, id: &str, address: &str) -> Option<String> {
        let explorer = self.chain(id)?.explorer.as_ref()?;
        if explorer.url.is_empty() {
            return None;
        }
        let path =
            if explorer.address_path.is_empty() { "/address/{address}" } else { &explorer.address_path };
        Some(format!("{}{}", explorer.url.trim_end_matches('/'), path.replace("{address}", address)))
    }
}

// ── Validators ─────────────────────────────────────────────────────────────

/// Validator profiles indexed by operator, consensus and broadcaster address.
#[derive(Debug, Clone, Default)]
pub struct ValidatorResolver {
    profiles: Vec<ValidatorProfile>,
    by_operator: HashMap<String, usize>,
    by_consensus: HashMap<String, usize>,
    by_broadcaster: HashMap<String, usize>,
}

impl ValidatorResolver {
    pub fn new(profiles: Vec<ValidatorProfile>) -> Self {
        let mut resolver = Self { profiles, ..Default::default() };
        for (i, p) in resolver.profiles.iter().enumerate() {
            resolver.by_operator.insert(p.operator_address.to_lowercase(), i);
            if let Some(c) = &p.consensus_address {
                resolver.by_consensus.insert(c.to_lowercase(), i);
            }
            if let Some(b) = &p.broadcaster_address {
                resolver.by_broadcaster.insert(b.to_lowercase(), i);
            }
        }
        resolver
    }

    pub fn profiles(&self) -> &[ValidatorProfile] {
        &self.profiles
    }

    pub fn by_operator(&self, address: &str) -> Option<&ValidatorProfile> {
        self.by_operator.get(&address.to_lowercase()).map(|i| &self.profiles[*i])
    }

    pub fn by_consensus(&self, address: &str) -> Option<&ValidatorProfile> {
        self.by_consensus.get(&address.to_lowercase()).map(|i| &self.profiles[*i])
    }

    pub fn by_broadcaster(&self, address: &str) -> Option<&ValidatorProfile> {
        self.by_broadcaster.get(&address.to_lowercase()).map(|i| &self.profiles[*i])
    }

    /// Any of the three address kinds.
    pub fn resolve(&self, address: &str) -> Option<&ValidatorProfile> {
        self.by_operator(address)
            .or_else(|| self.by_consensus(address))
            .or_else(|| self.by_broadcaster(address))
    }

    /// Moniker for any address kind, or the address itself.
    pub fn moniker<'a>(&'a self, address: &'a str) -> &'a str {
        self.resolve(address)
            .map(|p| p.moniker.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{ChainType, ExplorerLinks};

    fn chains() -> ChainResolver {
        ChainResolver::new(vec![ChainEntry {
            id: "ethereum".into(),
            name: "Ethereum".into(),
            chain_type: ChainType::Evm,
            image: Some("/logos/eth.svg".into()),
            explorer: Some(ExplorerLinks {
                url: "https://etherscan.io/".into(),
                address_path: "/address/{address}".into(),
                transaction_path: "/tx/{tx}".into(),
            }),
        }])
    }

    #[test]
    fn chain_lookup_is_case_insensitive() {
        let c = chains();
        assert_eq!(c.chain("ETHEREUM").map(|c| c.id.as_str()), Some("ethereum"));
        assert_eq!(c.image("Ethereum"), Some("/logos/eth.svg"));
        assert_eq!(c.name("avalanche"), "avalanche");
    }

    #[test]
    fn explorer_urls() {
        let c = chains();
        assert_eq!(
            c.explorer_tx_url("ethereum", "0xabc").as_deref(),
            Some("https://etherscan.io/tx/0xabc")
        );
        assert_eq!(
            c.explorer_address_url("ethereum", "0xdef").as_deref(),
            Some("https://etherscan.io/address/0xdef")
        );
        assert_eq!(c.explorer_tx_url("fantom", "0x1"), None);
    }

    #[test]
    fn validator_lookup_by_any_address() {
        let v = ValidatorResolver::new(vec![ValidatorProfile {
            operator_address: "axelarvaloper1op".into(),
            moniker: "Node A".into(),
            consensus_address: Some("axelarvalcons1cons".into()),
            broadcaster_address: Some("axelar1proxy".into()),
            ..Default::default()
        }]);
        assert_eq!(v.moniker("axelarvaloper1op"), "Node A");
        assert_eq!(v.moniker("AXELARVALCONS1CONS"), "Node A");
        assert_eq!(v.by_broadcaster("axelar1proxy").map(|p| p.moniker.as_str()), Some("Node A"));
        assert_eq!(v.moniker("axelar1unknown"), "axelar1unknown");
    }
}
