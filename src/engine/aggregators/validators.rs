// Validator records merged by operator address from staking validators,
// slashing signing infos, and the CLI-only snapshot/proxy/tendermint queries.
// Account and consensus addresses are derived locally; the CLI validator set
// only lists active validators and serves as a cross-check.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::Value;

use axlscan_core::address::{consensus_address, operator_to_account};
use axlscan_core::metrics::uptime_from_signing_info;
use axlscan_core::{CliSource, ScanResult, SlashingParams, TssIllegibilityInfo, ValidatorRecord};

use crate::engine::cli_proxy::{
    parse_deactivated_operators, parse_proxy, parse_snapshot_validators, parse_validator_set, proxy_cmd,
    ConsensusValidator, CMD_DEACTIVATED_OPERATORS, CMD_SNAPSHOT_VALIDATORS, CMD_TENDERMINT_VALIDATOR_SET,
};
use crate::engine::context::ReferenceData;
use crate::engine::fetchers::Fetchers;

/// CLI results are cached by the proxy for this long.
const CLI_CACHE_SECS: u64 = 300;

/// Raw inputs of the merge. Every CLI-derived part may be empty.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSources {
    pub staking: Vec<Value>,
    pub signing_infos: Vec<Value>,
    pub consensus_set: Vec<ConsensusValidator>,
    /// Keyed by lowercase operator address.
    pub illegibility: HashMap<String, TssIllegibilityInfo>,
    pub deactivated: HashSet<String>,
    /// Lowercase operator address → broadcaster address.
    pub proxies: HashMap<String, String>,
    /// Lowercase operator address → height of the proxy registration.
    pub proxy_heights: HashMap<String, u64>,
}

fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn u64_at(v: &Value, pointer: &str) -> Option<u64> {
    match v.pointer(pointer)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Merge all sources into records ordered by bonded tokens, largest first.
pub fn merge_validators(
    sources: &ValidatorSources,
    reference: &ReferenceData,
    native_denom: &str,
    params: Option<&SlashingParams>,
) -> Vec<ValidatorRecord> {
    let consensus_by_pubkey: HashMap<&str, &str> =
        sources.consensus_set.iter().map(|c| (c.pub_key.as_str(), c.address.as_str())).collect();
    let signing_by_address: HashMap<String, &Value> = sources
        .signing_infos
        .iter()
        .filter_map(|i| Some((str_at(i, "/address")?.to_lowercase(), i)))
        .collect();

    let mut records: Vec<ValidatorRecord> = sources
        .staking
        .iter()
        .filter_map(|v| {
            let operator = str_at(v, "/operator_address")?.to_string();
            let key = operator.to_lowercase();
            let profile = reference.validators.by_operator(&operator);

            let pubkey = str_at(v, "/consensus_pubkey/key");
            let derived = pubkey.and_then(consensus_address);
            let listed = pubkey.and_then(|pk| consensus_by_pubkey.get(pk).map(|a| a.to_string()));
            if let (Some(d), Some(l)) = (&derived, &listed) {
                if !d.eq_ignore_ascii_case(l) {
                    warn!("[validators] {}: derived consensus address {} differs from validator set {}", operator, d, l);
                }
            }
            let consensus_address =
                derived.or(listed).or_else(|| profile.and_then(|p| p.consensus_address.clone()));
            let signing = consensus_address.as_ref().and_then(|a| signing_by_address.get(&a.to_lowercase()));

            let missed_blocks_counter = signing.and_then(|s| u64_at(s, "/missed_blocks_counter"));
            let uptime = match (missed_blocks_counter, params) {
                (Some(missed), Some(p)) => uptime_from_signing_info(missed, p),
                _ => None,
            };
            let tss_illegibility_info = sources.illegibility.get(&key).cloned();

            Some(ValidatorRecord {
                consensus_address,
                delegator_address: operator_to_account(&operator)
                    .or_else(|| profile.and_then(|p| p.delegator_address.clone())),
                broadcaster_address: sources
                    .proxies
                    .get(&key)
                    .cloned()
                    .or_else(|| profile.and_then(|p| p.broadcaster_address.clone())),
                moniker: str_at(v, "/description/moniker")
                    .map(String::from)
                    .or_else(|| profile.map(|p| p.moniker.clone()).filter(|m| !m.is_empty())),
                status: str_at(v, "/status").map(String::from),
                tokens: reference.denoms.amount(v.get("tokens"), native_denom, None),
                jailed: v.get("jailed").and_then(|j| j.as_bool()).unwrap_or(false),
                tombstoned: signing.and_then(|s| s.get("tombstoned")).and_then(|t| t.as_bool()).unwrap_or(false),
                start_height: signing.and_then(|s| u64_at(s, "/start_height")),
                start_proxy_height: sources.proxy_heights.get(&key).copied(),
                missed_blocks_counter,
                uptime,
                illegible: tss_illegibility_info.as_ref().is_some_and(|i| i.any()),
                tss_illegibility_info,
                deregistering: sources.deactivated.contains(&key),
                operator_address: operator,
            })
        })
        .collect();

    records.sort_by(|a, b| b.tokens.total_cmp(&a.tokens).then_with(|| a.operator_address.cmp(&b.operator_address)));
    records
}

async fn cli_stdout(cli: &dyn CliSource, cmd: &str) -> Option<String> {
    match cli.exec(cmd, true, Some(CLI_CACHE_SECS)).await {
        Ok(stdout) => Some(stdout),
        Err(e) => {
            debug!("[validators] cli '{}' failed: {}", cmd, e);
            None
        }
    }
}

/// Registration heights for every operator with a known broadcaster.
async fn proxy_heights(
    fetchers: &Fetchers,
    sources: &ValidatorSources,
    reference: &ReferenceData,
) -> HashMap<String, u64> {
    let accounts: Vec<(String, String)> = sources
        .staking
        .iter()
        .filter_map(|v| {
            let operator = str_at(v, "/operator_address")?;
            let key = operator.to_lowercase();
            let profile = reference.validators.by_operator(operator);
            if !sources.proxies.contains_key(&key) && profile.and_then(|p| p.broadcaster_address.as_ref()).is_none() {
                return None;
            }
            let account =
                operator_to_account(operator).or_else(|| profile.and_then(|p| p.delegator_address.clone()))?;
            Some((key, account))
        })
        .collect();

    join_all(accounts.into_iter().map(|(key, account)| async move {
        fetchers.proxy_registration_height(&account).await.map(|height| (key, height))
    }))
    .await
    .into_iter()
    .flatten()
    .collect()
}

/// Fetch every source and merge. `Ok(None)` when the staking validator list
/// itself is unavailable.
pub async fn load_validators(
    fetchers: &Fetchers,
    cli: Option<&dyn CliSource>,
    reference: &ReferenceData,
    native_denom: &str,
) -> ScanResult<Option<Vec<ValidatorRecord>>> {
    let Some(staking) = fetchers.all_validators(None).await? else {
        warn!("[validators] staking validators unavailable");
        return Ok(None);
    };

    let (signing, params) = tokio::join!(fetchers.all_signing_infos(), fetchers.slashing_params());
    let signing_infos = match signing {
        Ok(Some(set)) => set.items,
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("[validators] signing infos: {}", e);
            Vec::new()
        }
    };

    let mut sources = ValidatorSources { staking: staking.items, signing_infos, ..Default::default() };

    if let Some(cli) = cli {
        let operators: Vec<String> =
            sources.staking.iter().filter_map(|v| str_at(v, "/operator_address").map(String::from)).collect();

        let proxy_lookups = join_all(operators.iter().map(|op| async move {
            let stdout = cli_stdout(cli, &proxy_cmd(op)).await?;
            parse_proxy(&stdout).map(|broadcaster| (op.to_lowercase(), broadcaster))
        }));
        let (set, snapshot, deactivated, proxies) = tokio::join!(
            cli_stdout(cli, CMD_TENDERMINT_VALIDATOR_SET),
            cli_stdout(cli, CMD_SNAPSHOT_VALIDATORS),
            cli_stdout(cli, CMD_DEACTIVATED_OPERATORS),
            proxy_lookups,
        );

        sources.consensus_set = set.map(|s| parse_validator_set(&s)).unwrap_or_default();
        sources.illegibility = snapshot.map(|s| parse_snapshot_validators(&s)).unwrap_or_default();
        sources.deactivated = deactivated.map(|s| parse_deactivated_operators(&s)).unwrap_or_default();
        sources.proxies = proxies.into_iter().flatten().collect();
    }

    sources.proxy_heights = proxy_heights(fetchers, &sources, reference).await;

    let records = merge_validators(&sources, reference, native_denom, params.as_ref());
    info!(
        "[validators] merged {} validators ({} signing infos, {} proxies)",
        records.len(),
        sources.signing_infos.len(),
        sources.proxies.len()
    );
    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axlscan_core::{DenomEntry, ValidatorProfile};
    use serde_json::json;

    fn reference() -> ReferenceData {
        ReferenceData::new(
            vec![DenomEntry { id: "uaxl".into(), symbol: "AXL".into(), decimals: Some(6), ..Default::default() }],
            vec![],
            vec![ValidatorProfile {
                operator_address: "axelarvaloper1b".into(),
                moniker: "Bravo".into(),
                delegator_address: Some("axelar1b".into()),
                broadcaster_address: Some("axelar1proxyb-profile".into()),
                ..Default::default()
            }],
        )
    }

    fn sources() -> ValidatorSources {
        let mut illegibility = HashMap::new();
        illegibility.insert(
            "axelarvaloper1a".to_string(),
            TssIllegibilityInfo { stale_tss_heartbeat: true, ..Default::default() },
        );
        ValidatorSources {
            staking: vec![
                json!({
                    "operator_address": "axelarvaloper1a",
                    "consensus_pubkey": { "@type": "/cosmos.crypto.ed25519.PubKey", "key": "PKA" },
                    "jailed": false,
                    "status": "BOND_STATUS_BONDED",
                    "tokens": "5000000",
                    "description": { "moniker": "Alpha" }
                }),
                json!({
                    "operator_address": "axelarvaloper1b",
                    "consensus_pubkey": { "key": "PKB" },
                    "jailed": true,
                    "status": "BOND_STATUS_UNBONDING",
                    "tokens": "9000000",
                    "description": {}
                }),
                json!({
                    "operator_address": "axelarvaloper1v4nxw6rfdf4kcmtwdac8zunnw36hvamcm47djy",
                    "consensus_pubkey": { "key": "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=" },
                    "jailed": true,
                    "status": "BOND_STATUS_UNBONDED",
                    "tokens": "1000000",
                    "description": { "moniker": "Charlie" }
                }),
            ],
            signing_infos: vec![
                json!({
                    "address": "axelarvalcons1a",
                    "start_height": "100",
                    "missed_blocks_counter": "250",
                    "tombstoned": false
                }),
                json!({
                    "address": "axelarvalcons1fwcxlrjw8fm3t5sp64eap2jzxa3w2hdtutax5v",
                    "start_height": "40",
                    "missed_blocks_counter": "10000",
                    "tombstoned": true
                }),
            ],
            consensus_set: vec![ConsensusValidator { address: "axelarvalcons1a".into(), pub_key: "PKA".into(), voting_power: 5 }],
            illegibility,
            deactivated: ["axelarvaloper1b".to_string()].into_iter().collect(),
            proxies: [("axelarvaloper1a".to_string(), "axelar1proxya".to_string())].into_iter().collect(),
            proxy_heights: [("axelarvaloper1a".to_string(), 4_200)].into_iter().collect(),
        }
    }

    #[test]
    fn merges_all_sources() {
        let params = SlashingParams { signed_blocks_window: 10_000, min_signed_per_window: 0.05 };
        let records = merge_validators(&sources(), &reference(), "uaxl", Some(&params));
        assert_eq!(records.len(), 3);

        // Ordered by tokens.
        let b = &records[0];
        assert_eq!(b.operator_address, "axelarvaloper1b");
        assert_eq!(b.tokens, 9.0);
        assert_eq!(b.moniker.as_deref(), Some("Bravo"));
        assert_eq!(b.broadcaster_address.as_deref(), Some("axelar1proxyb-profile"));
        assert_eq!(b.delegator_address.as_deref(), Some("axelar1b"));
        assert!(b.jailed && b.deregistering);
        assert_eq!(b.uptime, None);

        let a = &records[1];
        assert_eq!(a.consensus_address.as_deref(), Some("axelarvalcons1a"));
        assert_eq!(a.broadcaster_address.as_deref(), Some("axelar1proxya"));
        assert_eq!(a.start_height, Some(100));
        assert_eq!(a.uptime, Some(97.5));
        assert!(a.illegible);
        assert!(!a.deregistering);
        assert_eq!(a.start_proxy_height, Some(4_200));
        assert_eq!(b.start_proxy_height, None);
    }

    #[test]
    fn jailed_validator_outside_the_active_set() {
        let params = SlashingParams { signed_blocks_window: 10_000, min_signed_per_window: 0.05 };
        let records = merge_validators(&sources(), &reference(), "uaxl", Some(&params));
        let c = &records[2];
        assert_eq!(c.moniker.as_deref(), Some("Charlie"));
        assert_eq!(c.consensus_address.as_deref(), Some("axelarvalcons1fwcxlrjw8fm3t5sp64eap2jzxa3w2hdtutax5v"));
        assert_eq!(c.delegator_address.as_deref(), Some("axelar1v4nxw6rfdf4kcmtwdac8zunnw36hvamcm5ggqt"));
        assert!(c.jailed && c.tombstoned);
        assert_eq!(c.start_height, Some(40));
        assert_eq!(c.missed_blocks_counter, Some(10_000));
        assert_eq!(c.uptime, Some(0.0));
    }

    #[test]
    fn uptime_stays_in_range() {
        let params = SlashingParams { signed_blocks_window: 100, min_signed_per_window: 0.5 };
        for r in merge_validators(&sources(), &reference(), "uaxl", Some(&params)) {
            if let Some(u) = r.uptime {
                assert!((0.0..=100.0).contains(&u));
            }
        }
    }
}
