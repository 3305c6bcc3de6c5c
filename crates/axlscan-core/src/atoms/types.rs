// ── axlscan Atoms: Pure Data Types ─────────────────────────────────────────
// Plain struct/enum definitions shared by the decoder, metrics and engine.
// Atoms layer rule: no I/O, no side effects.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ── Reference data ─────────────────────────────────────────────────────────

/// A raw on-chain coin as the LCD returns it (`amount` is an integer string).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// IBC alias of a denom on a counterparty chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IbcAlias {
    pub chain_id: String,
    pub ibc_denom: String,
    pub decimals: Option<u32>,
}

/// ERC-20 deployment of a denom on an EVM chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractInfo {
    pub chain_id: String,
    pub contract_address: String,
    #[serde(alias = "contract_decimals")]
    pub decimals: Option<u32>,
}

/// Denom registry entry. Immutable for the lifetime of a reference snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DenomEntry {
    pub id: String,
    pub symbol: String,
    #[serde(alias = "title")]
    pub name: String,
    pub decimals: Option<u32>,
    pub image: Option<String>,
    pub ibc: Vec<IbcAlias>,
    pub contracts: Vec<ContractInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    #[default]
    Cosmos,
    Evm,
}

/// Block-explorer URL templates for a chain. `{address}` / `{tx}` are
/// substituted by the resolvers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerLinks {
    pub url: String,
    pub address_path: String,
    pub transaction_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainEntry {
    pub id: String,
    pub name: String,
    pub chain_type: ChainType,
    pub image: Option<String>,
    pub explorer: Option<ExplorerLinks>,
}

/// Display profile of a validator, populated by bootstrap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorProfile {
    pub operator_address: String,
    pub moniker: String,
    pub image: Option<String>,
    pub consensus_address: Option<String>,
    pub delegator_address: Option<String>,
    pub broadcaster_address: Option<String>,
}

// ── Transactions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        }
    }
}

/// One transfer or action extracted from a transaction's logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recipient: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub failed: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, String>,
}

impl Activity {
    /// Placeholder row for a failed transaction that emitted no events.
    pub fn failed_sentinel() -> Self {
        Activity { failed: true, ..Default::default() }
    }
}

/// Display-ready transaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedTx {
    pub txhash: String,
    pub height: Option<u64>,
    pub timestamp: Option<String>,
    pub status: TxStatus,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub sender: Option<String>,
    pub fee: Option<f64>,
    pub gas_used: Option<u64>,
    pub gas_wanted: Option<u64>,
    pub memo: Option<String>,
    pub activities: Vec<Activity>,
}

// ── Validators ─────────────────────────────────────────────────────────────

/// Reasons a validator is not eligible for TSS, from the snapshot module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TssIllegibilityInfo {
    pub tombstoned: bool,
    pub jailed: bool,
    pub missed_too_many_blocks: bool,
    pub no_proxy_registered: bool,
    pub tss_suspended: bool,
    pub proxy_insuficient_funds: bool,
    pub stale_tss_heartbeat: bool,
}

impl TssIllegibilityInfo {
    pub fn any(&self) -> bool {
        self.tombstoned
            || self.jailed
            || self.missed_too_many_blocks
            || self.no_proxy_registered
            || self.tss_suspended
            || self.proxy_insuficient_funds
            || self.stale_tss_heartbeat
    }
}

/// Validator merged from staking, slashing, snapshot and proxy sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorRecord {
    pub operator_address: String,
    pub consensus_address: Option<String>,
    pub delegator_address: Option<String>,
    pub broadcaster_address: Option<String>,
    pub moniker: Option<String>,
    pub status: Option<String>,
    /// Bonded tokens in display units.
    pub tokens: f64,
    pub jailed: bool,
    pub tombstoned: bool,
    pub start_height: Option<u64>,
    pub start_proxy_height: Option<u64>,
    pub missed_blocks_counter: Option<u64>,
    /// Percentage in [0, 100].
    pub uptime: Option<f64>,
    pub illegible: bool,
    pub tss_illegibility_info: Option<TssIllegibilityInfo>,
    pub deregistering: bool,
}

/// Slashing module parameters that determine `maxMissed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlashingParams {
    pub signed_blocks_window: u64,
    pub min_signed_per_window: f64,
}

/// One sampled block in the uptime series of a single validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeBlock {
    pub height: u64,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub up: bool,
}

/// One heartbeat interval of a single broadcaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatBlock {
    pub height: u64,
    pub up: bool,
    pub key_ids: Vec<String>,
    pub ineligibilities: BTreeMap<String, String>,
}

// ── EVM bridging ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Signing,
    Signed,
    Aborted,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    pub id: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub command_type: String,
    pub params: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub executed: bool,
    #[serde(rename = "transactionHash", skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

/// Search documents carry explicit `null`s where the LCD omits a field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub chain: String,
    pub status: BatchStatus,
    pub commands: Vec<Command>,
}

// ── Search index wire types ────────────────────────────────────────────────

/// Request body of the search-index endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub index: String,
    pub method: String,
    pub query: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Value>,
    pub size: u64,
    pub from: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
}

impl SearchQuery {
    pub fn new(index: impl Into<String>, query: Value) -> Self {
        SearchQuery {
            index: index.into(),
            method: "search".into(),
            query,
            aggs: None,
            size: 10,
            from: 0,
            sort: None,
        }
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn from(mut self, from: u64) -> Self {
        self.from = from;
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn aggs(mut self, aggs: Value) -> Self {
        self.aggs = Some(aggs);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub data: Vec<Value>,
    pub aggs: Option<Value>,
    pub total: u64,
}
