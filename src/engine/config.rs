// axlscan Engine: Configuration
// ExplorerConfig, default_path, load, apply_env, validate
//
// Precedence: built-in defaults < TOML file < AXLSCAN_* environment variables.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use axlscan_core::atoms::constants::{
    DEFAULT_MAX_MISSED_BLOCKS, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, LIVE_POLL_SECS, NATIVE_DENOM,
    NUM_BLOCKS_PER_HEARTBEAT, NUM_EVM_VOTES_BLOCKS, NUM_HEARTBEAT_BLOCKS, NUM_UPTIME_BLOCKS, SLOW_POLL_SECS,
    TRANSACTIONS_CAP, TX_PAGE_SIZE,
};
use axlscan_core::{ScanError, ScanResult};

// ── Constants ──────────────────────────────────────────────────────────

pub const ENV_PREFIX: &str = "AXLSCAN_";
const CONFIG_DIR: &str = "axlscan";
const CONFIG_FILE: &str = "config.toml";

// ── Config Struct ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Cosmos-SDK REST endpoint.
    pub lcd_url: String,
    /// Search-index endpoint (single POST route).
    pub search_url: String,
    /// CLI-executor proxy. Without it, CLI-derived validator fields stay empty.
    pub cli_url: Option<String>,
    /// Denom used for fees and staking amounts.
    pub native_denom: String,
    pub num_uptime_blocks: u64,
    pub num_heartbeat_blocks: u64,
    pub num_blocks_per_heartbeat: u64,
    pub num_evm_votes_blocks: u64,
    /// Fallback `maxMissed` when slashing params are unavailable.
    pub max_missed_blocks: u64,
    pub page_size: u32,
    /// Iteration cap for cursor pagination.
    pub max_pages: usize,
    pub tx_cap: usize,
    /// Page size of the incremental transaction view.
    pub tx_page_size: u64,
    /// Live feeds (blocks, latest transactions).
    pub poll_secs: u64,
    /// Slow aggregates (validators, leaderboard).
    pub slow_poll_secs: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            lcd_url: "https://lcd-axelar.imperator.co".into(),
            search_url: "https://api.axelarscan.io".into(),
            cli_url: None,
            native_denom: NATIVE_DENOM.into(),
            num_uptime_blocks: NUM_UPTIME_BLOCKS,
            num_heartbeat_blocks: NUM_HEARTBEAT_BLOCKS,
            num_blocks_per_heartbeat: NUM_BLOCKS_PER_HEARTBEAT,
            num_evm_votes_blocks: NUM_EVM_VOTES_BLOCKS,
            max_missed_blocks: DEFAULT_MAX_MISSED_BLOCKS,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            tx_cap: TRANSACTIONS_CAP,
            tx_page_size: TX_PAGE_SIZE,
            poll_secs: LIVE_POLL_SECS,
            slow_poll_secs: SLOW_POLL_SECS,
            request_timeout_secs: 30,
            max_retries: crate::engine::http::MAX_RETRIES,
        }
    }
}

// ── Loading ────────────────────────────────────────────────────────────

impl ExplorerConfig {
    /// `<config dir>/axlscan/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_toml(text: &str) -> ScanResult<Self> {
        toml::from_str(text).map_err(|e| ScanError::Config(format!("invalid config file: {}", e)))
    }

    /// Load from `path` (must exist) or the default path (optional), then
    /// apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> ScanResult<Self> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| ScanError::Config(format!("cannot read {}: {}", p.display(), e)))?;
                info!("[config] loaded {}", p.display());
                Self::from_toml(&text)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => {
                    let text = std::fs::read_to_string(&p)?;
                    info!("[config] loaded {}", p.display());
                    Self::from_toml(&text)?
                }
                None => {
                    debug!("[config] no config file, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AXLSCAN_*` overrides. Unknown keys are ignored; unparsable
    /// numbers are a configuration error.
    pub fn apply_env<I>(&mut self, vars: I) -> ScanResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else { continue };
            let value = value.trim().to_string();
            match name {
                "LCD_URL" => self.lcd_url = value,
                "SEARCH_URL" => self.search_url = value,
                "CLI_URL" => self.cli_url = Some(value).filter(|v| !v.is_empty()),
                "NATIVE_DENOM" => self.native_denom = value,
                "NUM_UPTIME_BLOCKS" => self.num_uptime_blocks = parse_env(&key, &value)?,
                "NUM_HEARTBEAT_BLOCKS" => self.num_heartbeat_blocks = parse_env(&key, &value)?,
                "NUM_BLOCKS_PER_HEARTBEAT" => self.num_blocks_per_heartbeat = parse_env(&key, &value)?,
                "NUM_EVM_VOTES_BLOCKS" => self.num_evm_votes_blocks = parse_env(&key, &value)?,
                "MAX_MISSED_BLOCKS" => self.max_missed_blocks = parse_env(&key, &value)?,
                "PAGE_SIZE" => self.page_size = parse_env(&key, &value)?,
                "MAX_PAGES" => self.max_pages = parse_env(&key, &value)?,
                "TX_CAP" => self.tx_cap = parse_env(&key, &value)?,
                "TX_PAGE_SIZE" => self.tx_page_size = parse_env(&key, &value)?,
                "POLL_SECS" => self.poll_secs = parse_env(&key, &value)?,
                "SLOW_POLL_SECS" => self.slow_poll_secs = parse_env(&key, &value)?,
                "REQUEST_TIMEOUT_SECS" => self.request_timeout_secs = parse_env(&key, &value)?,
                "MAX_RETRIES" => self.max_retries = parse_env(&key, &value)?,
                _ => continue,
            }
            debug!("[config] {} overridden from environment", key);
        }
        Ok(())
    }

    pub fn validate(&self) -> ScanResult<()> {
        for (field, url) in [("lcd_url", Some(&self.lcd_url)), ("search_url", Some(&self.search_url)), ("cli_url", self.cli_url.as_ref())] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ScanError::Config(format!("{} must be an http(s) URL, got '{}'", field, url)));
                }
            }
        }
        if self.page_size == 0 || self.max_pages == 0 || self.tx_page_size == 0 {
            return Err(ScanError::Config("page_size, max_pages and tx_page_size must be positive".into()));
        }
        if self.num_blocks_per_heartbeat == 0 {
            return Err(ScanError::Config("num_blocks_per_heartbeat must be positive".into()));
        }
        if self.poll_secs == 0 || self.slow_poll_secs == 0 {
            return Err(ScanError::Config("poll intervals must be positive".into()));
        }
        if self.native_denom.is_empty() {
            return Err(ScanError::Config("native_denom must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ScanResult<T> {
    value
        .parse()
        .map_err(|_| ScanError::Config(format!("{} has an invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let c = ExplorerConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.num_blocks_per_heartbeat, 50);
        assert_eq!(c.max_missed_blocks, 500);
        assert_eq!(c.tx_cap, 500);
    }

    #[test]
    fn toml_fills_missing_fields() {
        let c = ExplorerConfig::from_toml("lcd_url = \"http://localhost:1317\"\npage_size = 25\n").unwrap();
        assert_eq!(c.lcd_url, "http://localhost:1317");
        assert_eq!(c.page_size, 25);
        assert_eq!(c.native_denom, "uaxl");
        assert!(matches!(ExplorerConfig::from_toml("page_size = \"x\""), Err(ScanError::Config(_))));
    }

    #[test]
    fn env_overrides() {
        let mut c = ExplorerConfig::default();
        c.apply_env(env(&[
            ("AXLSCAN_CLI_URL", "http://cli.local"),
            ("AXLSCAN_NUM_UPTIME_BLOCKS", "200"),
            ("AXLSCAN_TX_PAGE_SIZE", "50"),
            ("AXLSCAN_UNKNOWN", "1"),
            ("HOME", "/root"),
        ]))
        .unwrap();
        assert_eq!(c.cli_url.as_deref(), Some("http://cli.local"));
        assert_eq!(c.num_uptime_blocks, 200);
        assert_eq!(c.tx_page_size, 50);
    }

    #[test]
    fn invalid_env_number_is_config_error() {
        let mut c = ExplorerConfig::default();
        let err = c.apply_env(env(&[("AXLSCAN_PAGE_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn validation_rejects_bad_urls() {
        let c = ExplorerConfig { search_url: "ftp://x".into(), ..Default::default() };
        assert!(c.validate().is_err());
        let c = ExplorerConfig { tx_page_size: 0, ..Default::default() };
        assert!(c.validate().is_err());
    }
}
