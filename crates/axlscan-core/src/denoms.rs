// axlscan core: Denomination Converter
// DenomRegistry lookups (id / symbol / name / image), raw → display amounts,
// and numeric-prefix splitting of coin strings ("100uaxl").

use serde_json::Value;

use crate::atoms::constants::DEFAULT_DECIMALS;
use crate::atoms::types::DenomEntry;

// ── Raw amount coercion ────────────────────────────────────────────────────

/// Anything that can stand in for a raw integer amount. Non-numeric input
/// coerces to 0 so conversion never fails.
pub trait RawAmount {
    fn raw_value(&self) -> f64;
}

impl RawAmount for f64 {
    fn raw_value(&self) -> f64 {
        if self.is_finite() { *self } else { 0.0 }
    }
}

impl RawAmount for u64 {
    fn raw_value(&self) -> f64 {
        *self as f64
    }
}

impl RawAmount for u128 {
    fn raw_value(&self) -> f64 {
        *self as f64
    }
}

impl RawAmount for i64 {
    fn raw_value(&self) -> f64 {
        *self as f64
    }
}

impl RawAmount for &str {
    fn raw_value(&self) -> f64 {
        self.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

impl RawAmount for String {
    fn raw_value(&self) -> f64 {
        self.as_str().raw_value()
    }
}

impl RawAmount for &String {
    fn raw_value(&self) -> f64 {
        self.as_str().raw_value()
    }
}

impl RawAmount for &Value {
    fn raw_value(&self) -> f64 {
        match self {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.as_str().raw_value(),
            _ => 0.0,
        }
    }
}

impl<T: RawAmount> RawAmount for Option<T> {
    fn raw_value(&self) -> f64 {
        self.as_ref().map(|v| v.raw_value()).unwrap_or(0.0)
    }
}

// ── Registry ───────────────────────────────────────────────────────────────

/// Static denom reference data. Lookups match an entry's `id` or any of its
/// IBC aliases; every label accessor falls back to the input denom.
#[derive(Debug, Clone, Default)]
pub struct DenomRegistry {
    entries: Vec<DenomEntry>,
}

impl DenomRegistry {
    pub fn new(entries: Vec<DenomEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DenomEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry whose id or IBC alias equals `denom`. IBC hashes compare
    /// case-insensitively since chains disagree on hex casing.
    pub fn get(&self, denom: &str) -> Option<&DenomEntry> {
        let denom = denom.trim();
        if denom.is_empty() {
            return None;
        }
        self.entries.iter().find(|d| {
            d.id == denom || d.ibc.iter().any(|i| i.ibc_denom.eq_ignore_ascii_case(denom))
        })
    }

    /// Canonical id, or `denom` unchanged.
    pub fn id<'a>(&'a self, denom: &'a str) -> &'a str {
        self.get(denom).map(|d| d.id.as_str()).unwrap_or(denom)
    }

    pub fn symbol<'a>(&'a self, denom: &'a str) -> &'a str {
        self.get(denom)
            .map(|d| d.symbol.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(denom)
    }

    pub fn name<'a>(&'a self, denom: &'a str) -> &'a str {
        self.get(denom)
            .map(|d| d.name.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(denom)
    }

    pub fn image<'a>(&'a self, denom: &'a str) -> &'a str {
        self.get(denom)
            .and_then(|d| d.image.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(denom)
    }

    /// Decimals for `denom`: chain-specific contract / IBC override when
    /// `chain_id` is given, else the entry's decimals, else 6.
    pub fn decimals(&self, denom: &str, chain_id: Option<&str>) -> u32 {
        let Some(entry) = self.get(denom) else {
            return DEFAULT_DECIMALS;
        };
        let chain_override = chain_id.and_then(|chain| {
            entry
                .contracts
                .iter()
                .find(|c| c.chain_id.eq_ignore_ascii_case(chain))
                .and_then(|c| c.decimals)
                .or_else(|| {
                    entry
                        .ibc
                        .iter()
                        .find(|i| i.chain_id.eq_ignore_ascii_case(chain))
                        .and_then(|i| i.decimals)
                })
        });
        chain_override.or(entry.decimals).unwrap_or(DEFAULT_DECIMALS)
    }

    /// Raw integer amount → display amount (`value / 10^decimals`).
    pub fn amount<V: RawAmount>(&self, value: V, denom: &str, chain_id: Option<&str>) -> f64 {
        let decimals = self.decimals(denom, chain_id);
        value.raw_value() / 10f64.powi(decimals as i32)
    }
}

// ── Coin strings ───────────────────────────────────────────────────────────

/// Split a coin string into its numeric prefix and denom suffix.
///
/// `"100uaxl"` → `(Some(100.0), Some("uaxl"))`, `"ibc/27…"` → `(None, Some(..))`,
/// `"42"` → `(Some(42.0), None)`.
pub fn split_amount_denom(coin: &str) -> (Option<f64>, Option<String>) {
    let coin = coin.trim();
    let boundary = coin
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(coin.len());
    let (number, denom) = coin.split_at(boundary);
    let amount = if number.is_empty() { None } else { number.parse::<f64>().ok() };
    let denom = if denom.is_empty() { None } else { Some(denom.to_string()) };
    (amount, denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{ContractInfo, IbcAlias};

    fn registry() -> DenomRegistry {
        DenomRegistry::new(vec![
            DenomEntry {
                id: "uaxl".into(),
                symbol: "AXL".into(),
                name: "Axelar".into(),
                decimals: Some(6),
                image: Some("/logos/axl.svg".into()),
                ..Default::default()
            },
            DenomEntry {
                id: "uusdc".into(),
                symbol: "USDC".into(),
                name: "USD Coin".into(),
                decimals: Some(6),
                ibc: vec![IbcAlias {
                    chain_id: "osmosis".into(),
                    ibc_denom: "ibc/D189335C6E4A68B513C10AB227BF1C1D38C746766278BA3EEB4FB14124F1D858".into(),
                    decimals: None,
                }],
                contracts: vec![ContractInfo {
                    chain_id: "binance".into(),
                    contract_address: "0x4268B8F0B87b6Eae5d897996E6b845ddbD99Adf3".into(),
                    decimals: Some(18),
                }],
                ..Default::default()
            },
            DenomEntry { id: "wei".into(), symbol: "ETH".into(), decimals: Some(18), ..Default::default() },
        ])
    }

    #[test]
    fn amount_divides_by_decimals() {
        let r = registry();
        assert_eq!(r.amount("5000", "uaxl", None), 0.005);
        assert_eq!(r.amount(1_000_000u64, "uaxl", None), 1.0);
        assert_eq!(r.amount("1000000000000000000", "wei", None), 1.0);
        assert_eq!(r.amount(0u64, "uaxl", None), 0.0);
    }

    #[test]
    fn amount_of_non_numeric_is_zero() {
        let r = registry();
        assert_eq!(r.amount("abc", "uaxl", None), 0.0);
        assert_eq!(r.amount(&Value::Null, "uaxl", None), 0.0);
        assert_eq!(r.amount(None::<&str>, "uaxl", None), 0.0);
    }

    #[test]
    fn unknown_denom_defaults_to_six_decimals() {
        let r = registry();
        assert_eq!(r.amount("2500000", "unknown", None), 2.5);
        assert_eq!(DenomRegistry::default().amount("1000000", "uaxl", None), 1.0);
    }

    #[test]
    fn chain_override_wins_over_entry_decimals() {
        let r = registry();
        assert_eq!(r.decimals("uusdc", Some("binance")), 18);
        assert_eq!(r.decimals("uusdc", Some("ethereum")), 6);
        assert_eq!(r.decimals("uusdc", None), 6);
    }

    #[test]
    fn labels_fall_back_to_input() {
        let r = registry();
        assert_eq!(r.symbol("uaxl"), "AXL");
        assert_eq!(r.name("uaxl"), "Axelar");
        assert_eq!(r.image("uaxl"), "/logos/axl.svg");
        assert_eq!(r.symbol("ufoo"), "ufoo");
        assert_eq!(r.name("ufoo"), "ufoo");
        assert_eq!(r.image("wei"), "wei");
        assert_eq!(r.id("ufoo"), "ufoo");
    }

    #[test]
    fn ibc_alias_resolves_to_entry() {
        let r = registry();
        let alias = "ibc/d189335c6e4a68b513c10ab227bf1c1d38c746766278ba3eeb4fb14124f1d858";
        assert_eq!(r.id(alias), "uusdc");
        assert_eq!(r.symbol(alias), "USDC");
    }

    #[test]
    fn split_coin_strings() {
        assert_eq!(split_amount_denom("100uaxl"), (Some(100.0), Some("uaxl".to_string())));
        assert_eq!(split_amount_denom("42"), (Some(42.0), None));
        assert_eq!(split_amount_denom("uaxl"), (None, Some("uaxl".to_string())));
        assert_eq!(
            split_amount_denom("7ibc/ABC"),
            (Some(7.0), Some("ibc/ABC".to_string()))
        );
        assert_eq!(split_amount_denom(""), (None, None));
    }
}
