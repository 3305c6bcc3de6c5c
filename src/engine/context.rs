// axlscan Engine: reference context
// Denoms, chains and validator profiles shared read-only by the aggregators.
//
// Lifecycle: populated once at startup (`replace` / `load_file`), refreshed
// periodically by the same call. Readers take a `snapshot()` and keep using
// it for the duration of one aggregation, so a refresh never changes data
// underneath a running computation.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Deserialize;

use axlscan_core::{ChainEntry, ChainResolver, DenomEntry, DenomRegistry, ScanError, ScanResult, ValidatorProfile, ValidatorResolver};

#[derive(Debug, Default)]
pub struct ReferenceData {
    pub denoms: DenomRegistry,
    pub chains: ChainResolver,
    pub validators: ValidatorResolver,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// On-disk / bootstrap-endpoint shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceFile {
    #[serde(alias = "assets")]
    pub denoms: Vec<DenomEntry>,
    pub chains: Vec<ChainEntry>,
    pub validators: Vec<ValidatorProfile>,
}

impl ReferenceData {
    pub fn new(denoms: Vec<DenomEntry>, chains: Vec<ChainEntry>, validators: Vec<ValidatorProfile>) -> Self {
        ReferenceData {
            denoms: DenomRegistry::new(denoms),
            chains: ChainResolver::new(chains),
            validators: ValidatorResolver::new(validators),
            refreshed_at: Some(Utc::now()),
        }
    }
}

#[derive(Clone, Default)]
pub struct ReferenceContext {
    inner: Arc<RwLock<Arc<ReferenceData>>>,
}

impl ReferenceContext {
    pub fn new(data: ReferenceData) -> Self {
        ReferenceContext { inner: Arc::new(RwLock::new(Arc::new(data))) }
    }

    /// Current view; cheap to clone and immune to later refreshes.
    pub fn snapshot(&self) -> Arc<ReferenceData> {
        self.inner.read().clone()
    }

    pub fn replace(&self, data: ReferenceData) {
        info!(
            "[context] reference data refreshed: {} denoms, {} chains, {} validators",
            data.denoms.entries().len(),
            data.chains.chains().len(),
            data.validators.profiles().len()
        );
        *self.inner.write() = Arc::new(data);
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().refreshed_at
    }

    /// Load a JSON reference file `{ denoms|assets, chains, validators }`.
    pub fn load_file(&self, path: &Path) -> ScanResult<()> {
        let text = std::fs::read_to_string(path)?;
        let file: ReferenceFile = serde_json::from_str(&text)
            .map_err(|e| ScanError::Config(format!("invalid reference file {}: {}", path.display(), e)))?;
        self.replace(ReferenceData::new(file.denoms, file.chains, file.validators));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_survives_refresh() {
        let ctx = ReferenceContext::default();
        assert!(ctx.refreshed_at().is_none());
        let before = ctx.snapshot();

        let uaxl = DenomEntry { id: "uaxl".into(), symbol: "AXL".into(), decimals: Some(6), ..Default::default() };
        ctx.replace(ReferenceData::new(vec![uaxl], vec![], vec![]));

        assert!(before.denoms.is_empty());
        assert_eq!(ctx.snapshot().denoms.symbol("uaxl"), "AXL");
        assert!(ctx.refreshed_at().is_some());
    }

    #[test]
    fn reference_file_accepts_assets_alias() {
        let file: ReferenceFile = serde_json::from_str(r#"{"assets":[{"id":"uaxl","decimals":6}]}"#).unwrap();
        assert_eq!(file.denoms.len(), 1);
        assert!(file.chains.is_empty());
    }
}
