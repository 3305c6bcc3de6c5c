// axlscan Engine: paginated fetchers
// "all-X" fetchers over LCD list endpoints, the transactions-by-events
// loaders, and single-shot lookups (latest block, slashing params, tx).
//
// Failure semantics: a failing first request yields `Ok(None)` and the
// caller keeps its previous state; only the pagination iteration cap
// surfaces as `Err`.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use axlscan_core::atoms::constants::TX_PAGE_SIZE;
use axlscan_core::paging::{collect_all, plan_tx_page, KeyedMerge, PageRequest, PageSet, PagingMode, TxCursor};
use axlscan_core::tx::timestamp_ms;
use axlscan_core::{DenomRegistry, LcdSource, ScanError, ScanResult, SlashingParams};

use super::config::ExplorerConfig;
use super::lcd::segment;

const TXS_PATH: &str = "/cosmos/tx/v1beta1/txs";

const REGISTER_PROXY_EVENT: &str = "message.action='/axelar.snapshot.v1beta1.RegisterProxyRequest'";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub timestamp_ms: Option<i64>,
    pub proposer_address: Option<String>,
}

/// One step of the incremental transaction view.
#[derive(Debug, Clone, Serialize)]
pub struct TxPage {
    /// Newest first.
    pub txs: Vec<Value>,
    pub cursor: TxCursor,
    /// The caller must replace its list instead of merging.
    pub replace: bool,
    pub total: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountOverview {
    pub address: String,
    pub balances: Option<Vec<Value>>,
    pub delegations: Option<Vec<Value>>,
    pub unbondings: Option<Vec<Value>>,
    pub rewards: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRow {
    pub denom: String,
    pub symbol: String,
    pub amount: f64,
}

impl AccountOverview {
    /// Balances in display units, unknown denoms labelled by their raw id.
    pub fn balance_rows(&self, registry: &DenomRegistry) -> Vec<BalanceRow> {
        self.balances
            .iter()
            .flatten()
            .filter_map(|coin| {
                let denom = coin.get("denom")?.as_str()?;
                Some(BalanceRow {
                    denom: registry.id(denom).to_string(),
                    symbol: registry.symbol(denom).to_string(),
                    amount: registry.amount(coin.get("amount"), denom, None),
                })
            })
            .collect()
    }
}

pub struct Fetchers {
    lcd: Arc<dyn LcdSource>,
    page_size: u32,
    max_pages: usize,
    tx_cap: usize,
    tx_page_size: u64,
}

impl Fetchers {
    pub fn new(lcd: Arc<dyn LcdSource>, config: &ExplorerConfig) -> Self {
        Self::with_limits(lcd, config.page_size, config.max_pages, config.tx_cap)
            .with_tx_page_size(config.tx_page_size)
    }

    pub fn with_limits(lcd: Arc<dyn LcdSource>, page_size: u32, max_pages: usize, tx_cap: usize) -> Self {
        Fetchers {
            lcd,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            tx_cap,
            tx_page_size: TX_PAGE_SIZE,
        }
    }

    pub fn with_tx_page_size(mut self, tx_page_size: u64) -> Self {
        self.tx_page_size = tx_page_size.max(1);
        self
    }

    pub fn lcd(&self) -> &dyn LcdSource {
        self.lcd.as_ref()
    }

    async fn collect(&self, request: PageRequest, key: &str) -> ScanResult<Option<PageSet>> {
        let request = request.limit(self.page_size);
        let set = collect_all(self.lcd.as_ref(), &request, key, self.max_pages).await?;
        if let Some(set) = &set {
            debug!("[fetch] {}: {} items in {} page(s)", request.resource, set.items.len(), set.pages);
        }
        Ok(set)
    }

    // ── all-X fetchers ─────────────────────────────────────────────────

    pub async fn all_bank_balances(&self, address: &str) -> ScanResult<Option<PageSet>> {
        let path = format!("/cosmos/bank/v1beta1/balances/{}", segment(address));
        self.collect(PageRequest::new("balances", path, "balances"), "/denom").await
    }

    pub async fn all_staking_delegations(&self, delegator: &str) -> ScanResult<Option<PageSet>> {
        let path = format!("/cosmos/staking/v1beta1/delegations/{}", segment(delegator));
        self.collect(PageRequest::new("delegations", path, "delegation_responses"), "/delegation/validator_address")
            .await
    }

    pub async fn all_validator_delegations(&self, validator: &str) -> ScanResult<Option<PageSet>> {
        let path = format!("/cosmos/staking/v1beta1/validators/{}/delegations", segment(validator));
        self.collect(
            PageRequest::new("validator delegations", path, "delegation_responses"),
            "/delegation/delegator_address",
        )
        .await
    }

    pub async fn all_unbonding_delegations(&self, delegator: &str) -> ScanResult<Option<PageSet>> {
        let path = format!("/cosmos/staking/v1beta1/delegators/{}/unbonding_delegations", segment(delegator));
        self.collect(PageRequest::new("unbondings", path, "unbonding_responses"), "/validator_address").await
    }

    /// `status` is a `BOND_STATUS_*` filter.
    pub async fn all_validators(&self, status: Option<&str>) -> ScanResult<Option<PageSet>> {
        let mut request = PageRequest::new("validators", "/cosmos/staking/v1beta1/validators", "validators");
        if let Some(status) = status {
            request = request.param("status", status);
        }
        self.collect(request, "/operator_address").await
    }

    pub async fn all_signing_infos(&self) -> ScanResult<Option<PageSet>> {
        let request = PageRequest::new("signing infos", "/cosmos/slashing/v1beta1/signing_infos", "info");
        self.collect(request, "/address").await
    }

    /// `status` is a `PROPOSAL_STATUS_*` filter.
    pub async fn all_proposals(&self, status: Option<&str>) -> ScanResult<Option<PageSet>> {
        let mut request = PageRequest::new("proposals", "/cosmos/gov/v1beta1/proposals", "proposals");
        if let Some(status) = status {
            request = request.param("proposal_status", status);
        }
        self.collect(request, "/proposal_id").await
    }

    // ── transactions ───────────────────────────────────────────────────

    fn tx_request(events: &[String], order: &str) -> PageRequest {
        let mut request = PageRequest::new("transactions", TXS_PATH, "tx_responses");
        for event in events {
            request = request.param("events", event.as_str());
        }
        request.param("order_by", order)
    }

    /// Newest transactions matching `events`, merged into `existing`.
    ///
    /// Walks offsets newest-first and stops when the backend is exhausted,
    /// when a page adds nothing that was not already loaded, or (unless
    /// `unlimited`) once the cap is reached. The result is sorted by height
    /// descending and, unless `unlimited`, trimmed to the cap.
    pub async fn transactions_by_events(
        &self,
        events: &[String],
        existing: Vec<Value>,
        unlimited: bool,
    ) -> ScanResult<Option<PageSet>> {
        let request = Self::tx_request(events, "ORDER_BY_DESC");
        let limit = u64::from(self.page_size);
        let mut merged = KeyedMerge::with_existing("/txhash", existing);
        let had_existing = !merged.is_empty();

        let mut offset = 0u64;
        let mut pages = 0usize;
        let mut total = None;
        let mut complete = true;

        loop {
            if pages >= self.max_pages {
                warn!("[fetch] transactions still paging after {} pages, giving up", pages);
                return Err(ScanError::PaginationLimit { resource: request.resource.clone(), pages });
            }
            let page = match self.lcd.fetch_offset(&request, offset, limit).await {
                Ok(page) => page,
                Err(e) if pages == 0 => {
                    warn!("[fetch] transactions first page failed: {}", e);
                    return Ok(None);
                }
                Err(e) => {
                    warn!("[fetch] transactions page {} failed, keeping partial set: {}", pages + 1, e);
                    complete = false;
                    break;
                }
            };
            pages += 1;
            total = page.total.or(total);

            let received = page.items.len() as u64;
            let added = merged.extend(page.items);
            offset += received;

            if received < limit || total.is_some_and(|t| offset >= t) {
                break;
            }
            if had_existing && added == 0 {
                debug!("[fetch] transactions caught up with loaded set at offset {}", offset);
                break;
            }
            if !unlimited && merged.len() >= self.tx_cap {
                break;
            }
        }

        let mut items = merged.into_items();
        items.sort_by_key(|tx| std::cmp::Reverse(tx_height(tx)));
        if !unlimited {
            items.truncate(self.tx_cap);
        }
        Ok(Some(PageSet { items, pages, total, complete }))
    }

    /// One step of the incremental view; see `plan_tx_page`.
    pub async fn transactions_by_events_paging(
        &self,
        events: &[String],
        cursor: Option<TxCursor>,
        mode: PagingMode,
    ) -> ScanResult<Option<TxPage>> {
        let request = Self::tx_request(events, "ORDER_BY_ASC");

        // Offsets only stay stable in ascending order; read the total first.
        let total = match self.lcd.fetch_offset(&request, 0, 1).await {
            Ok(page) => match page.total {
                Some(total) => total,
                None => {
                    warn!("[fetch] transactions response carries no total, cannot plan offsets");
                    return Ok(None);
                }
            },
            Err(e) => {
                warn!("[fetch] transactions count failed: {}", e);
                return Ok(None);
            }
        };

        let Some(plan) = plan_tx_page(mode, cursor.as_ref(), total, self.tx_page_size) else {
            return Ok(Some(TxPage { txs: Vec::new(), cursor: cursor.unwrap_or_default(), replace: false, total }));
        };

        let page = match self.lcd.fetch_offset(&request, plan.offset, plan.limit).await {
            Ok(page) => page,
            Err(e) => {
                warn!("[fetch] transactions offset {} failed: {}", plan.offset, e);
                return Ok(None);
            }
        };
        let mut txs = page.items;
        txs.reverse();
        let next = TxCursor::after(mode, cursor.as_ref(), &plan, total);
        debug!("[fetch] {:?}: {} txs at offset {} (cursor {:?})", mode, txs.len(), plan.offset, next);
        Ok(Some(TxPage { txs, cursor: next, replace: plan.replace, total }))
    }

    pub async fn tx(&self, hash: &str) -> Option<Value> {
        let path = format!("{}/{}", TXS_PATH, segment(hash));
        self.single("tx", &path).await
    }

    /// Height of the newest proxy registration sent by `account`. Heartbeats
    /// of its current broadcaster can only start from there.
    pub async fn proxy_registration_height(&self, account: &str) -> Option<u64> {
        let events = [REGISTER_PROXY_EVENT.to_string(), format!("message.sender='{}'", account)];
        let request = Self::tx_request(&events, "ORDER_BY_DESC");
        match self.lcd.fetch_offset(&request, 0, 1).await {
            Ok(page) => page.items.first().map(tx_height).filter(|h| *h > 0),
            Err(e) => {
                debug!("[fetch] proxy registration of {}: {}", account, e);
                None
            }
        }
    }

    // ── single lookups ─────────────────────────────────────────────────

    async fn single(&self, what: &str, path: &str) -> Option<Value> {
        match self.lcd.get_json(path, &[]).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("[fetch] {} failed: {}", what, e);
                None
            }
        }
    }

    pub async fn latest_block(&self) -> Option<BlockHeader> {
        let v = self.single("latest block", "/cosmos/base/tendermint/v1beta1/blocks/latest").await?;
        block_header(&v)
    }

    pub async fn block(&self, height: u64) -> Option<BlockHeader> {
        let path = format!("/cosmos/base/tendermint/v1beta1/blocks/{}", height);
        let v = self.single("block", &path).await?;
        block_header(&v)
    }

    pub async fn slashing_params(&self) -> Option<SlashingParams> {
        let v = self.single("slashing params", "/cosmos/slashing/v1beta1/params").await?;
        slashing_params_from(&v)
    }

    pub async fn delegation_rewards(&self, delegator: &str) -> Option<Value> {
        let path = format!("/cosmos/distribution/v1beta1/delegators/{}/rewards", segment(delegator));
        self.single("rewards", &path).await
    }

    pub async fn batch(&self, chain: &str, batch_id: &str) -> Option<Value> {
        let path = format!("/axelar/evm/v1beta1/batched_commands/{}/{}", segment(chain), segment(batch_id));
        self.single("batch", &path).await
    }

    /// Balances, delegations, unbondings and rewards, fetched concurrently.
    pub async fn account_overview(&self, address: &str) -> AccountOverview {
        let (balances, delegations, unbondings, rewards) = tokio::join!(
            self.all_bank_balances(address),
            self.all_staking_delegations(address),
            self.all_unbonding_delegations(address),
            self.delegation_rewards(address),
        );
        AccountOverview {
            address: address.to_string(),
            balances: items_or_none("balances", balances),
            delegations: items_or_none("delegations", delegations),
            unbondings: items_or_none("unbondings", unbondings),
            rewards,
        }
    }
}

fn items_or_none(what: &str, result: ScanResult<Option<PageSet>>) -> Option<Vec<Value>> {
    match result {
        Ok(set) => set.map(|s| s.items),
        Err(e) => {
            warn!("[fetch] account {}: {}", what, e);
            None
        }
    }
}

fn tx_height(tx: &Value) -> u64 {
    match tx.get("height") {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

pub fn block_header(v: &Value) -> Option<BlockHeader> {
    let header = v.pointer("/block/header").or_else(|| v.pointer("/sdk_block/header"))?;
    let height = match header.get("height")? {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    Some(BlockHeader {
        height,
        timestamp_ms: header.get("time").and_then(|t| t.as_str()).and_then(timestamp_ms),
        proposer_address: header.get("proposer_address").and_then(|p| p.as_str()).map(String::from),
    })
}

pub fn slashing_params_from(v: &Value) -> Option<SlashingParams> {
    let params = v.get("params")?;
    let window = params.get("signed_blocks_window")?;
    let signed_blocks_window = match window {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    let min_signed_per_window = match params.get("min_signed_per_window")? {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    Some(SlashingParams { signed_blocks_window, min_signed_per_window })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_block_header() {
        let v = json!({ "block": { "header": { "height": "1234", "time": "2024-01-01T00:00:00Z", "proposer_address": "ABC" } } });
        let h = block_header(&v).unwrap();
        assert_eq!(h.height, 1234);
        assert_eq!(h.timestamp_ms, Some(1_704_067_200_000));
        assert!(block_header(&json!({})).is_none());
    }

    #[test]
    fn parses_slashing_params() {
        let v = json!({ "params": { "signed_blocks_window": "10000", "min_signed_per_window": "0.050000000000000000" } });
        let p = slashing_params_from(&v).unwrap();
        assert_eq!(p.signed_blocks_window, 10_000);
        assert!((p.min_signed_per_window - 0.05).abs() < 1e-12);
    }

    #[test]
    fn balance_rows_use_registry() {
        let registry = DenomRegistry::new(vec![axlscan_core::DenomEntry {
            id: "uaxl".into(),
            symbol: "AXL".into(),
            decimals: Some(6),
            ..Default::default()
        }]);
        let overview = AccountOverview {
            balances: Some(vec![json!({ "denom": "uaxl", "amount": "2500000" }), json!({ "denom": "ufoo", "amount": "1" })]),
            ..Default::default()
        };
        let rows = overview.balance_rows(&registry);
        assert_eq!(rows[0], BalanceRow { denom: "uaxl".into(), symbol: "AXL".into(), amount: 2.5 });
        assert_eq!(rows[1].symbol, "ufoo");
    }
}
